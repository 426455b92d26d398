use crate::error::ModelError;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-band parameters the models take as vectors, one value per photometric band
pub const MULTI_BAND_PARAMS: [&str; 3] = ["b_sff", "mag_src", "mag_base"];

/// Per-band noise parameters, they modify data errors and never reach a model
pub const ERROR_PARAMS: [&str; 2] = ["add_err", "mult_err"];

/// Split a fit parameter name into its base name and 1-based band index
///
/// `"mag_src2"` gives `("mag_src", Some(2))`, `"t0"` gives `("t0", None)`. Names consisting of
/// digits only, and zero indices are not split.
pub fn split_param_filter_index(name: &str) -> (&str, Option<usize>) {
    let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if base.is_empty() || base.len() == name.len() {
        return (name, None);
    }
    match name[base.len()..].parse::<usize>() {
        Ok(index) if index > 0 => (base, Some(index)),
        _ => (name, None),
    }
}

/// Named parameter values ready to build a model
///
/// Scalar parameters are stored by name, per-band parameters from [MULTI_BAND_PARAMS] are
/// grouped into vectors ordered by band index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    scalars: BTreeMap<String, f64>,
    bands: BTreeMap<String, Vec<f64>>,
}

impl ModelParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect values of a parameter vector given their names
    ///
    /// Error parameters ([ERROR_PARAMS]) are skipped, per-band parameters are grouped, unknown
    /// indexed names are kept as scalars under their full name.
    pub fn from_named<S: AsRef<str>>(names: &[S], values: &[f64]) -> Self {
        names
            .iter()
            .zip(values)
            .fold(Self::new(), |params, (name, &value)| {
                params.with(name.as_ref(), value)
            })
    }

    /// Add a single value, splitting band index off per-band parameter names
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        let (base, index) = split_param_filter_index(name);
        if ERROR_PARAMS.contains(&base) {
            return;
        }
        match index {
            Some(index) if MULTI_BAND_PARAMS.contains(&base) => {
                let band = self.bands.entry(base.to_owned()).or_default();
                if band.len() < index {
                    band.resize(index, f64::NAN);
                }
                band[index - 1] = value;
            }
            _ => {
                self.scalars.insert(name.to_owned(), value);
            }
        }
    }

    /// Value of a scalar parameter
    pub fn get(&self, name: &str) -> Result<f64, ModelError> {
        self.scalars
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::MissingParameter(name.to_owned()))
    }

    /// Values of a per-band parameter
    pub fn band(&self, name: &str) -> Result<&[f64], ModelError> {
        self.bands
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ModelError::MissingParameter(format!("{name}1")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scalars.contains_key(name) || self.bands.contains_key(name)
    }

    pub fn scalars(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scalars.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn bands(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.bands.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
