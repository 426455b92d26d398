use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Output of a nested sampling run
///
/// Samples are ordered by increasing likelihood: first the dead points in the order they were
/// removed, then the final live points.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NestedRun {
    /// Parameter values, a row per sample
    pub samples: Array2<f64>,
    /// Unit-cube coordinates of the samples
    pub cube: Array2<f64>,
    pub ln_likelihood: Array1<f64>,
    /// Natural logarithm of the normalised posterior weights
    pub ln_weight: Array1<f64>,
    pub ln_evidence: f64,
    pub ln_evidence_err: f64,
    /// Kullback-Leibler divergence of the posterior from the prior, nats
    pub information: f64,
    pub n_iter: usize,
    pub n_calls: usize,
}

impl NestedRun {
    pub fn n_samples(&self) -> usize {
        self.ln_likelihood.len()
    }

    /// Normalised posterior weights
    pub fn weights(&self) -> Array1<f64> {
        self.ln_weight.mapv(f64::exp)
    }

    /// Index of the sample with the maximum likelihood
    pub fn max_likelihood_index(&self) -> usize {
        self.ln_likelihood
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(i_max, l_max), (i, &l)| {
                if l > l_max { (i, l) } else { (i_max, l_max) }
            })
            .0
    }

    /// Effective number of independent samples, Kish's formula
    pub fn effective_sample_size(&self) -> f64 {
        let w = self.weights();
        let sum = w.sum();
        sum * sum / w.mapv(|w| w * w).sum()
    }

    /// Equally weighted posterior samples by systematic resampling
    ///
    /// Returns as many samples as the run has, a sample may appear several times.
    pub fn resample_equal<R: Rng>(&self, rng: &mut R) -> Array2<f64> {
        let n = self.n_samples();
        let weights = self.weights();
        let total = weights.sum();
        let offset: f64 = rng.random();
        let mut indices = Vec::with_capacity(n);
        let mut cumulative = 0.0;
        let mut j = 0;
        let mut last = 0;
        for (i, &w) in weights.iter().enumerate() {
            if w > 0.0 {
                last = i;
            }
            cumulative += w / total;
            while j < n && (j as f64 + offset) / (n as f64) < cumulative {
                indices.push(i);
                j += 1;
            }
        }
        // Rounding may leave the last positions unfilled
        while indices.len() < n {
            indices.push(last);
        }
        self.samples.select(Axis(0), &indices)
    }
}
