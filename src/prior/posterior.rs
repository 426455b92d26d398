use crate::error::PriorError;

use ndarray::{ArrayView1, ArrayView2, Axis};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Joint prior of several parameters taken from the posterior of a previous fit
///
/// The posterior is stored as an N-dimensional histogram, only non-empty bins are kept. A draw
/// picks a bin by inverse transform sampling of the bin CDF and then a uniformly distributed
/// point inside the bin, so the prior is continuous and keeps correlations between the
/// parameters.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PosteriorHistogramPrior {
    names: Vec<String>,
    /// Bin edges of every parameter
    edges: Vec<Vec<f64>>,
    /// Cumulative probability of the non-empty bins
    cdf: Vec<f64>,
    /// Bin index along every parameter for each non-empty bin
    bin_indices: Vec<Vec<usize>>,
}

impl PosteriorHistogramPrior {
    pub fn new(
        names: Vec<String>,
        edges: Vec<Vec<f64>>,
        cdf: Vec<f64>,
        bin_indices: Vec<Vec<usize>>,
    ) -> Result<Self, PriorError> {
        let invalid = |reason| PriorError::InvalidParameters {
            distribution: "posterior histogram",
            reason,
        };
        if cdf.is_empty() {
            return Err(PriorError::EmptyHistogram);
        }
        if names.len() != edges.len() {
            return Err(invalid("every parameter needs bin edges"));
        }
        if cdf.len() != bin_indices.len() {
            return Err(invalid("every CDF value needs bin indices"));
        }
        if edges.iter().any(|e| e.len() < 2) {
            return Err(invalid("every parameter needs at least one bin"));
        }
        if cdf.windows(2).any(|w| w[1] < w[0]) {
            return Err(invalid("CDF must be non-decreasing"));
        }
        for indices in &bin_indices {
            if indices.len() != names.len()
                || indices
                    .iter()
                    .zip(&edges)
                    .any(|(&i, edges)| i + 1 >= edges.len())
            {
                return Err(invalid("bin index is out of range"));
            }
        }
        Ok(Self {
            names,
            edges,
            cdf,
            bin_indices,
        })
    }

    /// Histogram of weighted samples, `samples` has a row per sample and a column per parameter
    pub fn from_samples(
        names: Vec<String>,
        samples: ArrayView2<f64>,
        weights: ArrayView1<f64>,
        n_bins: usize,
    ) -> Result<Self, PriorError> {
        if samples.nrows() == 0 || samples.nrows() != weights.len() || n_bins == 0 {
            return Err(PriorError::EmptyHistogram);
        }
        let edges: Vec<Vec<f64>> = samples
            .axis_iter(Axis(1))
            .map(|column| {
                let (min, max) = column
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                        (lo.min(x), hi.max(x))
                    });
                let (min, max) = if max > min {
                    (min, max)
                } else {
                    let half = 0.5 * f64::max(min.abs() * 1e-6, 1e-12);
                    (min - half, max + half)
                };
                let width = (max - min) / n_bins as f64;
                (0..=n_bins).map(|i| min + i as f64 * width).collect()
            })
            .collect();

        let mut histogram: BTreeMap<Vec<usize>, f64> = BTreeMap::new();
        for (row, &w) in samples.outer_iter().zip(weights) {
            if w.is_nan() || w <= 0.0 {
                continue;
            }
            let indices = row
                .iter()
                .zip(&edges)
                .map(|(&x, edges)| {
                    let width = edges[1] - edges[0];
                    (((x - edges[0]) / width) as usize).min(n_bins - 1)
                })
                .collect();
            *histogram.entry(indices).or_insert(0.0) += w;
        }
        let total: f64 = histogram.values().sum();
        if total.is_nan() || total <= 0.0 {
            return Err(PriorError::EmptyHistogram);
        }
        let mut cumulative = 0.0;
        let (bin_indices, cdf): (Vec<Vec<usize>>, Vec<f64>) = histogram
            .into_iter()
            .map(|(indices, w)| {
                cumulative += w / total;
                (indices, cumulative)
            })
            .unzip();
        Self::new(names, edges, cdf, bin_indices)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn n_params(&self) -> usize {
        self.names.len()
    }

    /// Map unit-cube coordinates of the histogram parameters to parameter values
    ///
    /// The first coordinate selects the bin and its position inside the bin along the first
    /// parameter, the others give positions inside the bin along the other parameters.
    pub fn transform(&self, cube: &[f64]) -> Vec<f64> {
        assert_eq!(cube.len(), self.n_params(), "cube has wrong dimension");
        let r = cube[0];
        let bin = self.cdf.iter().position(|&c| c > r).unwrap_or(0);
        let prev = if bin == 0 { 0.0 } else { self.cdf[bin - 1] };
        let first_offset = if self.cdf[bin] > prev {
            ((r - prev) / (self.cdf[bin] - prev)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        self.bin_indices[bin]
            .iter()
            .zip(&self.edges)
            .enumerate()
            .map(|(i, (&index, edges))| {
                let offset = if i == 0 { first_offset } else { cube[i] };
                edges[index] + offset * (edges[index + 1] - edges[index])
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::{Array1, Array2};
    use rand::prelude::*;
    use rand_distr::Normal;

    #[test]
    fn single_bin() {
        let prior = PosteriorHistogramPrior::new(
            vec!["tE".into()],
            vec![vec![10.0, 20.0, 30.0]],
            vec![1.0],
            vec![vec![1]],
        )
        .unwrap();
        for u in [0.0, 0.3, 0.99] {
            let x = prior.transform(&[u])[0];
            assert!((20.0..=30.0).contains(&x), "{x}");
        }
    }

    #[test]
    fn invalid_indices() {
        assert!(
            PosteriorHistogramPrior::new(
                vec!["tE".into()],
                vec![vec![10.0, 20.0]],
                vec![1.0],
                vec![vec![1]],
            )
            .is_err()
        );
        assert_eq!(
            PosteriorHistogramPrior::new(vec![], vec![], vec![], vec![]),
            Err(PriorError::EmptyHistogram)
        );
    }

    #[test]
    fn reproduces_correlated_posterior() {
        let mut rng = StdRng::seed_from_u64(42);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let n = 20_000;
        let mut samples = Array2::zeros((n, 2));
        for mut row in samples.outer_iter_mut() {
            let a: f64 = normal.sample(&mut rng);
            let b: f64 = normal.sample(&mut rng);
            row[0] = a;
            row[1] = a + 0.1 * b;
        }
        let weights = Array1::ones(n);
        let prior = PosteriorHistogramPrior::from_samples(
            vec!["a".into(), "b".into()],
            samples.view(),
            weights.view(),
            30,
        )
        .unwrap();

        let draws: Vec<Vec<f64>> = (0..5000)
            .map(|_| prior.transform(&[rng.random(), rng.random()]))
            .collect();
        let mean_a = draws.iter().map(|d| d[0]).sum::<f64>() / draws.len() as f64;
        let mean_diff =
            draws.iter().map(|d| (d[1] - d[0]).abs()).sum::<f64>() / draws.len() as f64;
        assert!(mean_a.abs() < 0.1, "{mean_a}");
        // Correlation survives, bin width is about 0.25
        assert!(mean_diff < 0.3, "{mean_diff}");
    }

    #[test]
    fn zero_weights_are_skipped() {
        let samples = Array2::from_shape_vec((3, 1), vec![0.0, 5.0, 10.0]).unwrap();
        let weights = ndarray::array![0.0, 1.0, 0.0];
        let prior = PosteriorHistogramPrior::from_samples(
            vec!["x".into()],
            samples.view(),
            weights.view(),
            10,
        )
        .unwrap();
        for u in [0.0, 0.5, 1.0] {
            let x = prior.transform(&[u])[0];
            assert!((5.0..=6.0).contains(&x), "{x}");
        }
    }
}
