use crate::error::FitError;
use crate::sampler::NestedSamplerConfig;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Switch which is either common for all photometric bands or set band by band
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum BandSwitch {
    All(bool),
    PerBand(Vec<bool>),
}

impl BandSwitch {
    /// Value for every one of `n_bands` bands
    pub fn resolve(&self, n_bands: usize) -> Result<Vec<bool>, FitError> {
        match self {
            Self::All(value) => Ok(vec![*value; n_bands]),
            Self::PerBand(values) if values.len() == n_bands => Ok(values.clone()),
            Self::PerBand(values) => Err(FitError::WrongSwitchLength {
                expected: n_bands,
                actual: values.len(),
            }),
        }
    }
}

impl From<bool> for BandSwitch {
    fn from(value: bool) -> Self {
        Self::All(value)
    }
}

impl From<Vec<bool>> for BandSwitch {
    fn from(values: Vec<bool>) -> Self {
        Self::PerBand(values)
    }
}

/// Relative weights of the data sets in the likelihood
///
/// Weights multiply log-likelihoods of photometric bands and of the astrometry, ordered as
/// `[phot_1, ..., phot_n, ast]`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DataWeighting {
    /// All weights are unity
    #[default]
    None,
    /// Photometry as a whole weights as much as astrometry, relative weights of the bands are
    /// kept
    PhotAstromEqual,
    /// Every data set weights the same regardless of the number of points
    AllEqual,
    /// User-defined non-negative weights
    Custom(Vec<f64>),
}

/// Options of [crate::Solver]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct SolverOptions {
    /// Fit `add_errN` added in quadrature to the photometric errors of a band
    pub add_error_on_photometry: BandSwitch,
    /// Fit `mult_errN` scaling the photometric errors of a band
    pub multiply_error_on_photometry: BandSwitch,
    pub use_phot_optional_params: BandSwitch,
    /// Derived parameters to report instead of the model defaults
    pub custom_additional_param_names: Option<Vec<String>>,
    pub weighting: DataWeighting,
    /// Prefix of the output files, may include a directory
    pub outputfiles_basename: String,
    pub write_output: bool,
    pub sampler: NestedSamplerConfig,
}

impl SolverOptions {
    #[inline]
    pub fn default_add_error_on_photometry() -> BandSwitch {
        BandSwitch::All(false)
    }

    #[inline]
    pub fn default_multiply_error_on_photometry() -> BandSwitch {
        BandSwitch::All(false)
    }

    #[inline]
    pub fn default_use_phot_optional_params() -> BandSwitch {
        BandSwitch::All(true)
    }

    #[inline]
    pub fn default_custom_additional_param_names() -> Option<Vec<String>> {
        None
    }

    #[inline]
    pub fn default_weighting() -> DataWeighting {
        DataWeighting::None
    }

    #[inline]
    pub fn default_outputfiles_basename() -> String {
        "chains/1-".to_owned()
    }

    #[inline]
    pub fn default_write_output() -> bool {
        true
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FitError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<(), FitError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            add_error_on_photometry: Self::default_add_error_on_photometry(),
            multiply_error_on_photometry: Self::default_multiply_error_on_photometry(),
            use_phot_optional_params: Self::default_use_phot_optional_params(),
            custom_additional_param_names: Self::default_custom_additional_param_names(),
            weighting: Self::default_weighting(),
            outputfiles_basename: Self::default_outputfiles_basename(),
            write_output: Self::default_write_output(),
            sampler: NestedSamplerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_resolution() {
        assert_eq!(BandSwitch::All(true).resolve(3).unwrap(), vec![true; 3]);
        assert_eq!(
            BandSwitch::from(vec![true, false]).resolve(2).unwrap(),
            vec![true, false]
        );
        assert!(matches!(
            BandSwitch::PerBand(vec![true]).resolve(2),
            Err(FitError::WrongSwitchLength {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn options_from_partial_json() {
        let options: SolverOptions = serde_json::from_str(
            r#"{
                "add_error_on_photometry": [true, false],
                "multiply_error_on_photometry": true,
                "weighting": {"custom": [1.0, 0.5]},
                "sampler": {"n_live_points": 100}
            }"#,
        )
        .unwrap();
        assert_eq!(
            options.add_error_on_photometry,
            BandSwitch::PerBand(vec![true, false])
        );
        assert_eq!(options.multiply_error_on_photometry, BandSwitch::All(true));
        assert_eq!(options.use_phot_optional_params, BandSwitch::All(true));
        assert_eq!(options.weighting, DataWeighting::Custom(vec![1.0, 0.5]));
        assert_eq!(options.sampler.n_live_points, 100);
        assert_eq!(options.sampler.walks, NestedSamplerConfig::default_walks());
        assert_eq!(options.outputfiles_basename, "chains/1-");
    }

    #[test]
    fn unit_weighting_serialization() {
        assert_eq!(
            serde_json::to_string(&DataWeighting::PhotAstromEqual).unwrap(),
            r#""phot_astrom_equal""#
        );
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        let options = SolverOptions {
            weighting: DataWeighting::AllEqual,
            write_output: false,
            ..Default::default()
        };
        options.to_json_file(&path).unwrap();
        assert_eq!(SolverOptions::from_json_file(&path).unwrap(), options);
    }
}
