//! Nested-sampling fit of microlensing models to photometry and astrometry

mod layout;
pub use layout::ParamLayout;

mod options;
pub use options::{BandSwitch, DataWeighting, SolverOptions};

mod solver;
pub use solver::{Chi2Breakdown, Solver};
