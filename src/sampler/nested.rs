use crate::error::SamplerError;
use crate::sampler::NestedRun;
use crate::sampler::bounds::within_unit_cube;

use ndarray::{Array1, Array2};
use ordered_float::NotNan;
use rand::prelude::*;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Nested sampling of a posterior defined on the unit hypercube
///
/// The sampler keeps a set of live points drawn from the prior. Every iteration the point with
/// the lowest likelihood is moved to the dead set and replaced by a new point with a higher
/// likelihood, found by a random walk started from another live point. The prior volume inside
/// the likelihood contour shrinks by a factor of `exp(-1 / n_live_points)` per iteration, which
/// gives the Bayesian evidence and the posterior weights of the dead points.
///
/// Sampling stops when the evidence which could still be collected from the live points falls
/// below `evidence_tolerance` in the log-space, or after `max_iter` iterations if it is non-zero.
///
/// Public fields may be set directly, [NestedSampler::run] checks them before sampling.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(try_from = "NestedSamplerConfigParameters")]
pub struct NestedSamplerConfig {
    /// At least two
    pub n_live_points: usize,
    /// Positive
    pub evidence_tolerance: NotNan<f64>,
    pub max_iter: usize,
    /// Random walk steps per replacement, positive
    pub walks: usize,
    pub n_iter_before_update: usize,
    pub seed: Option<u64>,
}

impl NestedSamplerConfig {
    pub fn new(
        n_live_points: usize,
        evidence_tolerance: f64,
        max_iter: usize,
        walks: usize,
        n_iter_before_update: usize,
        seed: Option<u64>,
    ) -> Self {
        Self::try_new(
            n_live_points,
            evidence_tolerance,
            max_iter,
            walks,
            n_iter_before_update,
            seed,
        )
        .expect("n_live_points must be at least two, walks and evidence_tolerance positive")
    }

    pub fn try_new(
        n_live_points: usize,
        evidence_tolerance: f64,
        max_iter: usize,
        walks: usize,
        n_iter_before_update: usize,
        seed: Option<u64>,
    ) -> Result<Self, SamplerError> {
        let evidence_tolerance = NotNan::new(evidence_tolerance)
            .map_err(|_| SamplerError::InvalidConfig("evidence_tolerance must not be NaN"))?;
        let config = Self {
            n_live_points,
            evidence_tolerance,
            max_iter,
            walks,
            n_iter_before_update,
            seed,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SamplerError> {
        if self.n_live_points < 2 {
            return Err(SamplerError::InvalidConfig(
                "n_live_points must be at least two",
            ));
        }
        if self.walks == 0 {
            return Err(SamplerError::InvalidConfig("walks must be positive"));
        }
        if self.evidence_tolerance.into_inner() <= 0.0 {
            return Err(SamplerError::InvalidConfig(
                "evidence_tolerance must be positive",
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn default_n_live_points() -> usize {
        300
    }

    #[inline]
    pub fn default_evidence_tolerance() -> f64 {
        0.5
    }

    /// Zero means no limit
    #[inline]
    pub fn default_max_iter() -> usize {
        0
    }

    #[inline]
    pub fn default_walks() -> usize {
        25
    }

    #[inline]
    pub fn default_n_iter_before_update() -> usize {
        100
    }

    #[inline]
    pub fn default_seed() -> Option<u64> {
        None
    }
}

impl Default for NestedSamplerConfig {
    fn default() -> Self {
        Self::new(
            Self::default_n_live_points(),
            Self::default_evidence_tolerance(),
            Self::default_max_iter(),
            Self::default_walks(),
            Self::default_n_iter_before_update(),
            Self::default_seed(),
        )
    }
}

#[derive(Deserialize, JsonSchema)]
#[serde(default, rename = "NestedSamplerConfig")]
struct NestedSamplerConfigParameters {
    n_live_points: usize,
    evidence_tolerance: f64,
    max_iter: usize,
    walks: usize,
    n_iter_before_update: usize,
    seed: Option<u64>,
}

impl Default for NestedSamplerConfigParameters {
    fn default() -> Self {
        Self {
            n_live_points: NestedSamplerConfig::default_n_live_points(),
            evidence_tolerance: NestedSamplerConfig::default_evidence_tolerance(),
            max_iter: NestedSamplerConfig::default_max_iter(),
            walks: NestedSamplerConfig::default_walks(),
            n_iter_before_update: NestedSamplerConfig::default_n_iter_before_update(),
            seed: NestedSamplerConfig::default_seed(),
        }
    }
}

impl TryFrom<NestedSamplerConfigParameters> for NestedSamplerConfig {
    type Error = SamplerError;

    fn try_from(p: NestedSamplerConfigParameters) -> Result<Self, Self::Error> {
        Self::try_new(
            p.n_live_points,
            p.evidence_tolerance,
            p.max_iter,
            p.walks,
            p.n_iter_before_update,
            p.seed,
        )
    }
}

#[derive(Clone, Debug)]
struct Point {
    cube: Vec<f64>,
    params: Vec<f64>,
    ln_l: f64,
}

impl Point {
    fn new<P, L>(cube: Vec<f64>, prior_transform: &P, log_likelihood: &L) -> Self
    where
        P: Fn(&[f64]) -> Vec<f64>,
        L: Fn(&[f64]) -> f64,
    {
        let params = prior_transform(&cube);
        let ln_l = log_likelihood(&params);
        Self {
            cube,
            params,
            ln_l: if ln_l.is_finite() {
                ln_l
            } else {
                f64::NEG_INFINITY
            },
        }
    }
}

/// Running evidence and information integrals
#[derive(Clone, Copy, Debug)]
struct Evidence {
    ln_z: f64,
    h: f64,
}

impl Evidence {
    fn add(&mut self, ln_w: f64, ln_l: f64) {
        if ln_w == f64::NEG_INFINITY {
            return;
        }
        let ln_z_new = ln_add_exp(self.ln_z, ln_w);
        let old_part = if self.ln_z == f64::NEG_INFINITY {
            0.0
        } else {
            f64::exp(self.ln_z - ln_z_new) * (self.h + self.ln_z)
        };
        self.h = f64::exp(ln_w - ln_z_new) * ln_l + old_part - ln_z_new;
        self.ln_z = ln_z_new;
    }
}

fn ln_add_exp(a: f64, b: f64) -> f64 {
    let max = a.max(b);
    if max == f64::NEG_INFINITY {
        return max;
    }
    max + f64::ln(f64::exp(a - max) + f64::exp(b - max))
}

/// Nested sampler, see [NestedSamplerConfig] for the description of the algorithm
#[derive(Clone, Debug, Default)]
pub struct NestedSampler {
    pub config: NestedSamplerConfig,
}

impl NestedSampler {
    pub fn new(config: NestedSamplerConfig) -> Self {
        Self { config }
    }

    /// Sample the posterior of an `n_dims`-dimensional problem
    ///
    /// `prior_transform` maps a point of the unit hypercube to parameter values and
    /// `log_likelihood` evaluates the natural logarithm of the likelihood of them. Non-finite
    /// likelihood values mark points outside of the physically allowed region, sampling fails
    /// with [SamplerError::ZeroLikelihood] if all live points are there.
    pub fn run<P, L>(
        &self,
        n_dims: usize,
        prior_transform: P,
        log_likelihood: L,
    ) -> Result<NestedRun, SamplerError>
    where
        P: Fn(&[f64]) -> Vec<f64> + Sync,
        L: Fn(&[f64]) -> f64 + Sync,
    {
        if n_dims == 0 {
            return Err(SamplerError::NoDimensions);
        }
        let config = &self.config;
        config.validate()?;
        let n_live = config.n_live_points;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let initial: Vec<Vec<f64>> = (0..n_live)
            .map(|_| (0..n_dims).map(|_| rng.random()).collect())
            .collect();
        let mut live: Vec<Point> = initial
            .into_par_iter()
            .map(|cube| Point::new(cube, &prior_transform, &log_likelihood))
            .collect();
        let mut n_calls = n_live;

        let ln_shrink = -1.0 / n_live as f64;
        // ln(X_{i-1} - X_i) - ln X_{i-1}
        let ln_width_factor = f64::ln(-f64::exp_m1(ln_shrink));
        let mut ln_x = 0.0;
        let mut evidence = Evidence {
            ln_z: f64::NEG_INFINITY,
            h: 0.0,
        };
        let mut dead: Vec<(Point, f64)> = vec![];
        let mut scale = 1.0;
        let mut n_iter = 0;

        loop {
            let (worst, ln_l_max) = live.iter().enumerate().fold(
                (0, f64::NEG_INFINITY),
                |(worst, max), (i, p)| {
                    let worst = if p.ln_l < live[worst].ln_l { i } else { worst };
                    (worst, max.max(p.ln_l))
                },
            );
            if ln_l_max == f64::NEG_INFINITY {
                warn!(n_iter, n_calls, "all live points have zero likelihood");
                return Err(SamplerError::ZeroLikelihood { n_calls });
            }
            let d_ln_z = ln_add_exp(evidence.ln_z, ln_l_max + ln_x) - evidence.ln_z;
            if d_ln_z.is_finite() && d_ln_z < config.evidence_tolerance.into_inner() {
                break;
            }
            if config.max_iter > 0 && n_iter >= config.max_iter {
                info!(n_iter, "reached maximum number of iterations");
                break;
            }

            let ln_l_star = live[worst].ln_l;
            let ln_w = ln_l_star + ln_x + ln_width_factor;
            evidence.add(ln_w, ln_l_star);
            ln_x += ln_shrink;

            let start = loop {
                let i = rng.random_range(0..n_live);
                if i != worst {
                    break i;
                }
            };
            let std = live_std(&live, n_dims);
            let (point, accepted, calls) = self.random_walk(
                &live[start],
                ln_l_star,
                &std,
                scale,
                &mut rng,
                &prior_transform,
                &log_likelihood,
            );
            n_calls += calls;
            let rejected = config.walks - accepted;
            if accepted > rejected {
                scale *= f64::exp(1.0 / accepted as f64);
            } else if accepted < rejected {
                scale /= f64::exp(1.0 / rejected as f64);
            }

            let removed = std::mem::replace(&mut live[worst], point);
            dead.push((removed, ln_w));
            n_iter += 1;

            if config.n_iter_before_update > 0 && n_iter % config.n_iter_before_update == 0 {
                debug!(
                    n_iter,
                    n_calls,
                    ln_z = evidence.ln_z,
                    d_ln_z,
                    ln_l_star,
                    scale,
                    "nested sampling progress"
                );
            }
        }

        // The rest of the prior volume is shared by the live points
        live.sort_by(|a, b| a.ln_l.total_cmp(&b.ln_l));
        let ln_w_live = ln_x - (n_live as f64).ln();
        for point in live {
            let ln_w = point.ln_l + ln_w_live;
            evidence.add(ln_w, point.ln_l);
            dead.push((point, ln_w));
        }

        let n_samples = dead.len();
        let n_params = dead[0].0.params.len();
        let mut samples = Array2::zeros((n_samples, n_params));
        let mut cube = Array2::zeros((n_samples, n_dims));
        let mut ln_likelihood = Array1::zeros(n_samples);
        let mut ln_weight = Array1::zeros(n_samples);
        for (i, (point, ln_w)) in dead.into_iter().enumerate() {
            samples
                .row_mut(i)
                .assign(&Array1::from_vec(point.params));
            cube.row_mut(i).assign(&Array1::from_vec(point.cube));
            ln_likelihood[i] = point.ln_l;
            ln_weight[i] = ln_w - evidence.ln_z;
        }
        let information = evidence.h.max(0.0);
        let ln_evidence_err = f64::sqrt(information / n_live as f64);
        info!(
            n_iter,
            n_calls,
            ln_evidence = evidence.ln_z,
            ln_evidence_err,
            information,
            "nested sampling finished"
        );

        Ok(NestedRun {
            samples,
            cube,
            ln_likelihood,
            ln_weight,
            ln_evidence: evidence.ln_z,
            ln_evidence_err,
            information,
            n_iter,
            n_calls,
        })
    }

    /// Likelihood-constrained random walk, returns the final point, the number of accepted
    /// steps and the number of likelihood calls. If no step is accepted, the starting point is
    /// returned.
    #[allow(clippy::too_many_arguments)]
    fn random_walk<P, L>(
        &self,
        start: &Point,
        ln_l_star: f64,
        std: &[f64],
        scale: f64,
        rng: &mut StdRng,
        prior_transform: &P,
        log_likelihood: &L,
    ) -> (Point, usize, usize)
    where
        P: Fn(&[f64]) -> Vec<f64>,
        L: Fn(&[f64]) -> f64,
    {
        let mut current = start.clone();
        let mut accepted = 0;
        let mut calls = 0;
        for _ in 0..self.config.walks {
            let proposal: Vec<f64> = current
                .cube
                .iter()
                .zip(std)
                .map(|(&x, &s)| {
                    let step: f64 = rng.sample(StandardNormal);
                    x + scale * s * step
                })
                .collect();
            if !within_unit_cube(&proposal) {
                continue;
            }
            let candidate = Point::new(proposal, prior_transform, log_likelihood);
            calls += 1;
            if candidate.ln_l > ln_l_star {
                current = candidate;
                accepted += 1;
            }
        }
        (current, accepted, calls)
    }
}

/// Standard deviation of the live points along every dimension of the unit cube
fn live_std(live: &[Point], n_dims: usize) -> Vec<f64> {
    let n = live.len() as f64;
    (0..n_dims)
        .map(|d| {
            let mean = live.iter().map(|p| p.cube[d]).sum::<f64>() / n;
            let var = live.iter().map(|p| (p.cube[d] - mean).powi(2)).sum::<f64>() / n;
            // Collapsed dimensions still need to move
            var.sqrt().max(1e-9)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::prior::weighted_quantile;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn gaussian_problem() -> (
        impl Fn(&[f64]) -> Vec<f64> + Sync,
        impl Fn(&[f64]) -> f64 + Sync,
    ) {
        // Uniform prior on [-10, 10]^2, unit normal likelihood centred at (1, -2)
        let prior =
            |cube: &[f64]| -> Vec<f64> { cube.iter().map(|&u| -10.0 + 20.0 * u).collect() };
        let likelihood = |x: &[f64]| -> f64 {
            let r2 = (x[0] - 1.0).powi(2) + (x[1] + 2.0).powi(2);
            -0.5 * r2 - f64::ln(2.0 * PI)
        };
        (prior, likelihood)
    }

    fn config(seed: u64) -> NestedSamplerConfig {
        NestedSamplerConfig {
            n_live_points: 200,
            evidence_tolerance: NotNan::new(0.1).unwrap(),
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn default_config() {
        let config = NestedSamplerConfig::default();
        assert_eq!(config.n_live_points, 300);
        assert_eq!(config.evidence_tolerance.into_inner(), 0.5);
        assert_eq!(config.max_iter, 0);
        assert_eq!(config.walks, 25);
        assert_eq!(config.n_iter_before_update, 100);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn config_from_partial_json() {
        let config: NestedSamplerConfig =
            serde_json::from_str(r#"{"n_live_points": 50, "seed": 3}"#).unwrap();
        assert_eq!(config.n_live_points, 50);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.walks, NestedSamplerConfig::default_walks());
    }

    #[test]
    fn gaussian_evidence_and_posterior() {
        let (prior, likelihood) = gaussian_problem();
        let run = NestedSampler::new(config(0))
            .run(2, prior, likelihood)
            .unwrap();

        // Z = 1 / 400
        let true_ln_z = -f64::ln(400.0);
        assert!(
            (run.ln_evidence - true_ln_z).abs() < 4.0 * run.ln_evidence_err + 0.1,
            "ln Z = {} +- {}",
            run.ln_evidence,
            run.ln_evidence_err
        );
        assert_relative_eq!(run.weights().sum(), 1.0, max_relative = 1e-9);

        let weights = run.weights();
        let x = run.samples.column(0).to_vec();
        let y = run.samples.column(1).to_vec();
        let w = weights.to_vec();
        let median_x = weighted_quantile(&x, &[0.5], Some(&w))[0];
        let median_y = weighted_quantile(&y, &[0.5], Some(&w))[0];
        assert!((median_x - 1.0).abs() < 0.2, "{median_x}");
        assert!((median_y + 2.0).abs() < 0.2, "{median_y}");
        let q = weighted_quantile(&x, &[0.158_655, 0.841_345], Some(&w));
        assert!((0.5 * (q[1] - q[0]) - 1.0).abs() < 0.2, "{q:?}");
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let (prior, likelihood) = gaussian_problem();
        let sampler = NestedSampler::new(NestedSamplerConfig {
            max_iter: 300,
            ..config(7)
        });
        let a = sampler.run(2, &prior, &likelihood).unwrap();
        let b = sampler.run(2, &prior, &likelihood).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.n_iter, 300);
        assert_eq!(a.n_samples(), 300 + 200);
    }

    #[test]
    fn samples_are_ordered_by_likelihood_of_dead_points() {
        let (prior, likelihood) = gaussian_problem();
        let run = NestedSampler::new(NestedSamplerConfig {
            max_iter: 500,
            ..config(1)
        })
        .run(2, prior, likelihood)
        .unwrap();
        let ln_l = run.ln_likelihood.to_vec();
        assert!(ln_l.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn rejected_region_is_never_sampled() {
        // Likelihood is zero for x < 0.5
        let prior = |cube: &[f64]| cube.to_vec();
        let likelihood = |x: &[f64]| {
            if x[0] < 0.5 {
                f64::NAN
            } else {
                -0.5 * ((x[0] - 0.7) / 0.05).powi(2)
            }
        };
        let run = NestedSampler::new(config(2))
            .run(1, prior, likelihood)
            .unwrap();
        let weights = run.weights();
        for (x, w) in run.samples.column(0).iter().zip(weights.iter()) {
            if *x < 0.5 {
                assert_eq!(*w, 0.0);
            }
        }
    }

    #[test]
    fn zero_likelihood_everywhere() {
        let sampler = NestedSampler::new(NestedSamplerConfig {
            n_live_points: 20,
            ..config(0)
        });
        let result = sampler.run(2, |cube: &[f64]| cube.to_vec(), |_: &[f64]| f64::NAN);
        assert_eq!(result, Err(SamplerError::ZeroLikelihood { n_calls: 20 }));
        let result = sampler.run(
            2,
            |cube: &[f64]| cube.to_vec(),
            |_: &[f64]| f64::NEG_INFINITY,
        );
        assert!(matches!(result, Err(SamplerError::ZeroLikelihood { .. })));
    }

    #[test]
    fn too_few_live_points() {
        for n_live_points in [0, 1] {
            let sampler = NestedSampler::new(NestedSamplerConfig {
                n_live_points,
                ..config(0)
            });
            let (prior, likelihood) = gaussian_problem();
            assert_eq!(
                sampler.run(2, prior, likelihood),
                Err(SamplerError::InvalidConfig(
                    "n_live_points must be at least two"
                ))
            );

            let json = format!(r#"{{"n_live_points": {n_live_points}}}"#);
            assert!(serde_json::from_str::<NestedSamplerConfig>(&json).is_err());
        }
        assert!(NestedSamplerConfig::try_new(1, 0.5, 0, 25, 100, None).is_err());
    }

    #[test]
    fn invalid_walks_and_tolerance() {
        let (prior, likelihood) = gaussian_problem();
        let sampler = NestedSampler::new(NestedSamplerConfig {
            walks: 0,
            ..config(0)
        });
        assert!(matches!(
            sampler.run(2, &prior, &likelihood),
            Err(SamplerError::InvalidConfig(_))
        ));
        assert!(
            serde_json::from_str::<NestedSamplerConfig>(r#"{"evidence_tolerance": 0.0}"#).is_err()
        );
        assert_eq!(
            NestedSampler::default().run(0, &prior, &likelihood),
            Err(SamplerError::NoDimensions)
        );
    }

    #[test]
    fn counts_likelihood_calls() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        // Narrow peak at the corner makes many walk proposals leave the unit cube
        let calls = AtomicUsize::new(0);
        let likelihood = |x: &[f64]| {
            calls.fetch_add(1, Ordering::Relaxed);
            -0.5 * ((x[0] - 0.99) / 0.01).powi(2) - 0.5 * ((x[1] - 0.01) / 0.01).powi(2)
        };
        let run = NestedSampler::new(NestedSamplerConfig {
            n_live_points: 50,
            max_iter: 200,
            ..config(4)
        })
        .run(2, |cube: &[f64]| cube.to_vec(), likelihood)
        .unwrap();
        assert_eq!(run.n_calls, calls.load(Ordering::Relaxed));
        assert!(run.n_calls < 50 + run.n_iter * NestedSamplerConfig::default_walks());
    }
}
