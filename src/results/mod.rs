//! Posterior samples and their summaries

use crate::error::FitError;
use crate::prior::weighted_quantile;

use ndarray::{Array1, Array2, ArrayView1};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod io;
pub use io::FitSummary;

/// Akaike information criterion of a model with `k` parameters
pub fn calc_aic(k: usize, max_ln_l: f64) -> f64 {
    2.0 * (k as f64 - max_ln_l)
}

/// Bayesian information criterion of a model with `k` parameters fit to `n` measurements
pub fn calc_bic(n: usize, k: usize, max_ln_l: f64) -> f64 {
    (n as f64).ln() * k as f64 - 2.0 * max_ln_l
}

/// Which sample or statistic represents the best fit
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BestFitKind {
    /// Sample with the maximum likelihood
    MaxL,
    /// Sample with the maximum posterior weight
    Map,
    /// Weighted mean, errors are weighted standard deviations
    Mean,
    /// Weighted median, errors bound the 68.27% credible interval
    Median,
}

/// Width of a central credible interval
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum Sigma {
    One,
    Two,
    Three,
}

impl Sigma {
    /// Probability mass inside the interval
    pub fn probability(self) -> f64 {
        match self {
            Self::One => 0.682_689,
            Self::Two => 0.9545,
            Self::Three => 0.9973,
        }
    }

    /// Lower and upper quantiles of the interval
    pub fn bounds(self) -> (f64, f64) {
        let lo = 0.5 * (1.0 - self.probability());
        (lo, 1.0 - lo)
    }
}

/// Best-fit parameter values
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BestFit {
    pub names: Vec<String>,
    pub values: Vec<f64>,
    /// Lower and upper errors, present for [BestFitKind::Mean] and [BestFitKind::Median]
    pub errors: Option<Vec<(f64, f64)>>,
}

impl BestFit {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }
}

/// Median and errors of a parameter
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParamQuantiles {
    pub name: String,
    pub median: f64,
    pub err_lo: f64,
    pub err_hi: f64,
}

/// Weighted posterior samples of a fit
///
/// `samples` has a row per sample and a column per parameter named in `param_names`, the first
/// `n_dims` columns are sampled parameters and the others are derived from them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FitResult {
    pub param_names: Vec<String>,
    pub n_dims: usize,
    pub samples: Array2<f64>,
    /// Normalised posterior weights
    pub weights: Array1<f64>,
    pub ln_likelihood: Array1<f64>,
    pub ln_evidence: f64,
    pub ln_evidence_err: f64,
    pub information: f64,
}

impl FitResult {
    pub fn n_samples(&self) -> usize {
        self.samples.nrows()
    }

    pub fn n_params(&self) -> usize {
        self.param_names.len()
    }

    pub fn column(&self, name: &str) -> Result<ArrayView1<'_, f64>, FitError> {
        self.param_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.samples.column(i))
            .ok_or_else(|| FitError::MissingColumn(name.to_owned()))
    }

    pub fn max_ln_likelihood(&self) -> f64 {
        self.ln_likelihood.fold(f64::NEG_INFINITY, |a, &b| a.max(b))
    }

    fn argmax(values: &Array1<f64>) -> Result<usize, FitError> {
        values
            .iter()
            .enumerate()
            .filter(|(_, x)| !x.is_nan())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
            .ok_or(FitError::NoSamples)
    }

    fn row(&self, i: usize, errors: Option<Vec<(f64, f64)>>) -> BestFit {
        BestFit {
            names: self.param_names.clone(),
            values: self.samples.row(i).to_vec(),
            errors,
        }
    }

    pub fn best_fit(&self, kind: BestFitKind) -> Result<BestFit, FitError> {
        if self.n_samples() == 0 {
            return Err(FitError::NoSamples);
        }
        match kind {
            BestFitKind::MaxL => Ok(self.row(Self::argmax(&self.ln_likelihood)?, None)),
            BestFitKind::Map => Ok(self.row(Self::argmax(&self.weights)?, None)),
            BestFitKind::Mean => {
                let total = self.weights.sum();
                let (values, errors) = self
                    .samples
                    .columns()
                    .into_iter()
                    .map(|column| {
                        let mean = column.dot(&self.weights) / total;
                        let var = column
                            .iter()
                            .zip(&self.weights)
                            .map(|(&x, &w)| w * (x - mean).powi(2))
                            .sum::<f64>()
                            / total;
                        (mean, (var.sqrt(), var.sqrt()))
                    })
                    .unzip();
                Ok(BestFit {
                    names: self.param_names.clone(),
                    values,
                    errors: Some(errors),
                })
            }
            BestFitKind::Median => {
                let (values, errors) = self
                    .quantiles(Sigma::One)?
                    .into_iter()
                    .map(|q| (q.median, (q.err_lo, q.err_hi)))
                    .unzip();
                Ok(BestFit {
                    names: self.param_names.clone(),
                    values,
                    errors: Some(errors),
                })
            }
        }
    }

    /// Weighted median and distances to the bounds of the credible interval for every parameter
    pub fn quantiles(&self, sigma: Sigma) -> Result<Vec<ParamQuantiles>, FitError> {
        if self.n_samples() == 0 {
            return Err(FitError::NoSamples);
        }
        let (lo, hi) = sigma.bounds();
        let weights = self.weights.to_vec();
        Ok(self
            .param_names
            .iter()
            .zip(self.samples.columns())
            .map(|(name, column)| {
                let q = weighted_quantile(&column.to_vec(), &[0.5, lo, hi], Some(&weights));
                ParamQuantiles {
                    name: name.clone(),
                    median: q[0],
                    err_lo: q[0] - q[1],
                    err_hi: q[2] - q[0],
                }
            })
            .collect())
    }
}
