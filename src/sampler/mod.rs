//! Nested sampling of posterior distributions

mod bounds;

mod nested;
pub use nested::{NestedSampler, NestedSamplerConfig};

mod run;
pub use run::NestedRun;
