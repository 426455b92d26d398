pub use events::astrometry::{AstrometryArrays, LinearMotion};
pub use events::noise::{gaussian_noise, uniform_times};
pub use events::pspl::PsplLightCurve;
pub use events::types::TripleArray;
pub use events::{SYNTHETIC_PSPL_EVENTS, SyntheticEvent};

mod events;
