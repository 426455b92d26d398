//! Lensing geometry and magnification kernels

use crate::error::ModelError;

pub mod binary_lens;
pub use binary_lens::{BinaryLens, binary_lens_images, psbl_amplification};

pub mod constants;

pub mod magnification;
pub use magnification::{FiniteSource, centroid_shift, fspl_amplification, pspl_amplification};

pub mod parallax;
pub use parallax::{SkyPosition, parallax_factors, sun_position};

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64, ModelError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ModelError::Unphysical {
            name,
            value,
            reason: "must be positive and finite",
        })
    }
}
