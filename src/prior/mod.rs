//! Prior distributions of the fit parameters

pub mod data_driven;

mod defaults;
pub use defaults::{DefaultPrior, MUS_SCALE_FACTOR, default_prior};

mod posterior;
pub use posterior::PosteriorHistogramPrior;

mod prior_1d;
pub use prior_1d::{
    Log10NormalPrior1D, LogNormalPrior1D, NormalPrior1D, Prior1D, Prior1DTrait,
    TruncNormalPrior1D, UniformPrior1D,
};

/// Quantiles of weighted samples
///
/// Each sample represents the probability mass around its value, the sample CDF is linearly
/// interpolated between the mass centres. Quantiles outside the range of the centres give the
/// smallest or the largest value. Without weights all samples are equal.
pub fn weighted_quantile(
    values: &[f64],
    quantiles: &[f64],
    weights: Option<&[f64]>,
) -> Vec<f64> {
    if values.is_empty() {
        return vec![f64::NAN; quantiles.len()];
    }
    if let Some(w) = weights {
        assert_eq!(w.len(), values.len(), "weights and values must have same length");
    }
    let weight = |i: usize| weights.map_or(1.0, |w| w[i]);

    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_unstable_by(|&a, &b| values[a].total_cmp(&values[b]));
    let sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();

    let total: f64 = order.iter().map(|&i| weight(i)).sum();
    let mut cumulative = 0.0;
    let centres: Vec<f64> = order
        .iter()
        .map(|&i| {
            let w = weight(i);
            cumulative += w;
            (cumulative - 0.5 * w) / total
        })
        .collect();

    quantiles
        .iter()
        .map(|&q| {
            let j = centres.partition_point(|&c| c < q);
            if j == 0 {
                sorted[0]
            } else if j == centres.len() {
                sorted[sorted.len() - 1]
            } else if centres[j] == centres[j - 1] {
                sorted[j]
            } else {
                let frac = (q - centres[j - 1]) / (centres[j] - centres[j - 1]);
                sorted[j - 1] + frac * (sorted[j] - sorted[j - 1])
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn unweighted_median() {
        let q = weighted_quantile(&[3.0, 1.0, 2.0], &[0.5], None);
        assert_relative_eq!(q[0], 2.0);
    }

    #[test]
    fn interpolates_between_centres() {
        // Centres are at 1/8, 3/8, 5/8, 7/8
        let q = weighted_quantile(&[0.0, 1.0, 2.0, 3.0], &[0.0, 0.25, 0.5, 1.0], None);
        assert_relative_eq!(q[0], 0.0);
        assert_relative_eq!(q[1], 0.5);
        assert_relative_eq!(q[2], 1.5);
        assert_relative_eq!(q[3], 3.0);
    }

    #[test]
    fn weights_shift_quantiles() {
        let values = [0.0, 10.0];
        let q = weighted_quantile(&values, &[0.5], Some(&[3.0, 1.0]));
        // Centres at 3/8 and 7/8
        assert_relative_eq!(q[0], 2.5);
    }

    #[test]
    fn empty_values() {
        assert!(weighted_quantile(&[], &[0.5], None)[0].is_nan());
    }
}
