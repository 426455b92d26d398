#![doc = include_str!("../README.md")]

mod data;
pub use data::{Astrometry, DataSample, EventData, Photometry, SortedArray};

mod error;
pub use error::{DataError, FitError, ModelError, PriorError, SamplerError};

mod fitter;
pub use fitter::{
    BandSwitch, Chi2Breakdown, DataWeighting, ParamLayout, Solver, SolverOptions,
};

pub mod model;
pub use model::{
    MicrolensModel, MicrolensModelTrait, ModelFlags, ModelKind, ModelParams,
    split_param_filter_index,
};

mod number_ending;
pub(crate) use number_ending::number_ending;

pub mod physics;

pub mod prior;
pub use prior::{PosteriorHistogramPrior, Prior1D, Prior1DTrait, weighted_quantile};

mod results;
pub use results::{
    BestFit, BestFitKind, FitResult, FitSummary, ParamQuantiles, Sigma, calc_aic, calc_bic,
};

mod sampler;
pub use sampler::{NestedRun, NestedSampler, NestedSamplerConfig};

mod special;

pub use ndarray;
