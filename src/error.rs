/// Error returned when observational data is malformed
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DataError {
    #[error("{name}: array lengths differ, {left} != {right}")]
    LengthMismatch {
        name: String,
        left: usize,
        right: usize,
    },

    #[error("{0}: data set is empty")]
    Empty(String),

    #[error("{name}: non-finite value in {column}")]
    NonFinite { name: String, column: &'static str },

    #[error("{name}: errors must be positive, {column} has non-positive values")]
    NonPositiveError { name: String, column: &'static str },

    #[error("{0}: time must be non-decreasing")]
    Unsorted(String),

    #[error("astrometry set {0} has no photometry set with the same name")]
    UnmatchedAstrometry(String),

    #[error("{kind} data set #{index} doesn't exist")]
    MissingSet { kind: &'static str, index: usize },
}

/// Error returned when a model can't be constructed or evaluated
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ModelError {
    #[error("unknown parameter {0}")]
    UnknownParameter(String),

    #[error("parameter {0} is required by the model but missing")]
    MissingParameter(String),

    #[error("model expects {expected} values of {name}, got {actual}")]
    WrongBandCount {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unphysical parameter {name} = {value}: {reason}")]
    Unphysical {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("{0} uses parallax and requires sky coordinates of the event")]
    MissingCoordinates(&'static str),

    #[error("{model} doesn't model {what}")]
    Unsupported {
        model: &'static str,
        what: &'static str,
    },

    #[error("photometric band #{band} doesn't exist, model has {n_bands} band(s)")]
    NoBand { band: usize, n_bands: usize },

    #[error("unknown model {0}")]
    UnknownModel(String),
}

/// Error returned when a prior distribution can't be built
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PriorError {
    #[error("invalid {distribution} parameters: {reason}")]
    InvalidParameters {
        distribution: &'static str,
        reason: &'static str,
    },

    #[error("no default prior for parameter {0}")]
    NoDefault(String),

    #[error("prior for {name} needs {what}, which the data doesn't provide")]
    MissingData { name: String, what: &'static str },

    #[error("data are insufficient to build a prior for {0}")]
    InsufficientData(String),

    #[error("posterior histogram is empty")]
    EmptyHistogram,
}

/// Error returned by [crate::NestedSampler]
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SamplerError {
    #[error("invalid sampler configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("problem must have at least one dimension")]
    NoDimensions,

    #[error("likelihood is zero for every live point after {n_calls} calls")]
    ZeroLikelihood { n_calls: usize },
}

/// Error returned from [crate::Solver] and result I/O
#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Prior(#[from] PriorError),

    #[error(transparent)]
    Sampler(#[from] SamplerError),

    #[error("{kind} data are required to fit {model}")]
    DataRequired { kind: &'static str, model: String },

    #[error("parameter vector has {actual} values, {expected} expected")]
    WrongDimension { expected: usize, actual: usize },

    #[error("band switch has {actual} values for {expected} photometry sets")]
    WrongSwitchLength { expected: usize, actual: usize },

    #[error("weights: {0}")]
    Weights(&'static str),

    #[error("results have no samples")]
    NoSamples,

    #[error("column {0} is missing from the results table")]
    MissingColumn(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
