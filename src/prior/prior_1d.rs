use crate::error::PriorError;
use crate::special::{norm_cdf, norm_ln_pdf, norm_ppf};

use enum_dispatch::enum_dispatch;
use ordered_float::NotNan;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_10;
use std::fmt::Debug;
use std::hash::Hash;

#[enum_dispatch]
pub trait Prior1DTrait:
    Clone + Debug + Serialize + DeserializeOwned + PartialEq + Eq + Hash
{
    /// Percent point function, maps a unit-cube coordinate to the parameter value
    fn ppf(&self, u: f64) -> f64;

    /// Natural logarithm of the probability density at x
    fn ln_pdf(&self, x: f64) -> f64;

    /// Range of values with non-zero density
    fn support(&self) -> (f64, f64);
}

/// Prior distribution of a single fit parameter
///
/// Every distribution is sampled through its inverse CDF, so it can be used as a nested-sampling
/// prior transform of the unit hypercube.
#[enum_dispatch(Prior1DTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Prior1D {
    Uniform(UniformPrior1D),
    Normal(NormalPrior1D),
    LogNormal(LogNormalPrior1D),
    Log10Normal(Log10NormalPrior1D),
    TruncNormal(TruncNormalPrior1D),
}

impl Prior1D {
    pub fn uniform(left: f64, right: f64) -> Self {
        UniformPrior1D::new(left, right).into()
    }

    pub fn normal(mean: f64, std: f64) -> Self {
        NormalPrior1D::new(mean, std).into()
    }

    /// Log-normal distribution, `mu` and `sigma` are given for the natural logarithm of x
    pub fn log_normal(mu: f64, sigma: f64) -> Self {
        LogNormalPrior1D::new(mu, sigma).into()
    }

    /// Log-normal distribution, `mean` and `std` are given for the decimal logarithm of x
    pub fn log10_normal(mean: f64, std: f64) -> Self {
        Log10NormalPrior1D::new(mean, std).into()
    }

    /// Truncated normal distribution, `lo_cut` and `hi_cut` are in units of `std` from `mean`
    pub fn trunc_normal(mean: f64, std: f64, lo_cut: f64, hi_cut: f64) -> Self {
        TruncNormalPrior1D::new(mean, std, lo_cut, hi_cut).into()
    }

    /// Truncated normal distribution with bounds given in units of the parameter
    ///
    /// The mean is clipped into `[low_bound, hi_bound]`. If it lands on a bound, the
    /// distribution is cut at a hundredth of `std` beyond the mean on that side.
    pub fn trunc_normal_with_bounds(
        mean: f64,
        std: f64,
        low_bound: f64,
        hi_bound: f64,
    ) -> Result<Self, PriorError> {
        if low_bound.is_nan() || hi_bound.is_nan() || hi_bound <= low_bound {
            return Err(PriorError::InvalidParameters {
                distribution: "truncated normal",
                reason: "upper bound must be larger than lower bound",
            });
        }
        let clipped_mean = mean.clamp(low_bound, hi_bound);
        let (lo_cut, hi_cut) = if clipped_mean == low_bound {
            (-0.01 * std, (hi_bound - clipped_mean) / std)
        } else if clipped_mean == hi_bound {
            ((low_bound - clipped_mean) / std, 0.01 * std)
        } else {
            (
                (low_bound - clipped_mean) / std,
                (hi_bound - clipped_mean) / std,
            )
        };
        Ok(TruncNormalPrior1D::try_new(clipped_mean, std, lo_cut, hi_cut)?.into())
    }
}

fn not_nan(
    x: f64,
    distribution: &'static str,
    reason: &'static str,
) -> Result<NotNan<f64>, PriorError> {
    match NotNan::new(x) {
        Ok(x) if x.is_finite() => Ok(x),
        _ => Err(PriorError::InvalidParameters {
            distribution,
            reason,
        }),
    }
}

fn positive(
    x: f64,
    distribution: &'static str,
    reason: &'static str,
) -> Result<NotNan<f64>, PriorError> {
    let x = not_nan(x, distribution, reason)?;
    if x.into_inner() > 0.0 {
        Ok(x)
    } else {
        Err(PriorError::InvalidParameters {
            distribution,
            reason,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(into = "UniformPrior1DParameters", from = "UniformPrior1DParameters")]
pub struct UniformPrior1D {
    range: std::ops::RangeInclusive<NotNan<f64>>,
    ln_prob: NotNan<f64>,
}

impl UniformPrior1D {
    pub fn new(left: f64, right: f64) -> Self {
        Self::try_new(left, right).expect("left and right must be finite, left < right")
    }

    pub fn try_new(left: f64, right: f64) -> Result<Self, PriorError> {
        let left = not_nan(left, "uniform", "left must be finite")?;
        let right = not_nan(right, "uniform", "right must be finite")?;
        let width = positive(
            right.into_inner() - left.into_inner(),
            "uniform",
            "right must be larger than left",
        )?;
        Ok(Self {
            range: left..=right,
            ln_prob: NotNan::new(-width.into_inner().ln()).expect("width is positive and finite"),
        })
    }

    pub fn left(&self) -> f64 {
        self.range.start().into_inner()
    }

    pub fn right(&self) -> f64 {
        self.range.end().into_inner()
    }

    fn ln_prob(&self) -> f64 {
        self.ln_prob.into_inner()
    }
}

impl Prior1DTrait for UniformPrior1D {
    fn ppf(&self, u: f64) -> f64 {
        self.left() + u * (self.right() - self.left())
    }

    fn ln_pdf(&self, x: f64) -> f64 {
        match NotNan::new(x) {
            Ok(x) if self.range.contains(&x) => self.ln_prob(),
            _ => f64::NEG_INFINITY,
        }
    }

    fn support(&self) -> (f64, f64) {
        (self.left(), self.right())
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "UniformPrior1D")]
struct UniformPrior1DParameters {
    range: std::ops::RangeInclusive<f64>,
}

impl From<UniformPrior1D> for UniformPrior1DParameters {
    fn from(f: UniformPrior1D) -> Self {
        Self {
            range: f.left()..=f.right(),
        }
    }
}

impl From<UniformPrior1DParameters> for UniformPrior1D {
    fn from(f: UniformPrior1DParameters) -> Self {
        Self::new(*f.range.start(), *f.range.end())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(into = "NormalPrior1DParameters", from = "NormalPrior1DParameters")]
pub struct NormalPrior1D {
    mean: NotNan<f64>,
    std: NotNan<f64>,
}

impl NormalPrior1D {
    pub fn new(mean: f64, std: f64) -> Self {
        Self::try_new(mean, std).expect("mean must be finite, std must be positive")
    }

    pub fn try_new(mean: f64, std: f64) -> Result<Self, PriorError> {
        Ok(Self {
            mean: not_nan(mean, "normal", "mean must be finite")?,
            std: positive(std, "normal", "std must be positive and finite")?,
        })
    }

    fn mean(&self) -> f64 {
        self.mean.into_inner()
    }

    fn std(&self) -> f64 {
        self.std.into_inner()
    }
}

impl Prior1DTrait for NormalPrior1D {
    fn ppf(&self, u: f64) -> f64 {
        self.mean() + self.std() * norm_ppf(u)
    }

    fn ln_pdf(&self, x: f64) -> f64 {
        norm_ln_pdf((x - self.mean()) / self.std()) - self.std().ln()
    }

    fn support(&self) -> (f64, f64) {
        (f64::NEG_INFINITY, f64::INFINITY)
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "NormalPrior1D")]
struct NormalPrior1DParameters {
    mean: f64,
    std: f64,
}

impl From<NormalPrior1D> for NormalPrior1DParameters {
    fn from(f: NormalPrior1D) -> Self {
        Self {
            mean: f.mean(),
            std: f.std(),
        }
    }
}

impl From<NormalPrior1DParameters> for NormalPrior1D {
    fn from(f: NormalPrior1DParameters) -> Self {
        Self::new(f.mean, f.std)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(
    into = "LogNormalPrior1DParameters",
    from = "LogNormalPrior1DParameters"
)]
pub struct LogNormalPrior1D {
    mu: NotNan<f64>,
    sigma: NotNan<f64>,
}

impl LogNormalPrior1D {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self::try_new(mu, sigma).expect("mu must be finite, sigma must be positive")
    }

    pub fn try_new(mu: f64, sigma: f64) -> Result<Self, PriorError> {
        Ok(Self {
            mu: not_nan(mu, "log-normal", "mu must be finite")?,
            sigma: positive(sigma, "log-normal", "sigma must be positive and finite")?,
        })
    }

    fn mu(&self) -> f64 {
        self.mu.into_inner()
    }

    fn sigma(&self) -> f64 {
        self.sigma.into_inner()
    }
}

impl Prior1DTrait for LogNormalPrior1D {
    fn ppf(&self, u: f64) -> f64 {
        f64::exp(self.mu() + self.sigma() * norm_ppf(u))
    }

    fn ln_pdf(&self, x: f64) -> f64 {
        if x.is_nan() || x <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let ln_x = x.ln();
        norm_ln_pdf((ln_x - self.mu()) / self.sigma()) - self.sigma().ln() - ln_x
    }

    fn support(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "LogNormalPrior1D")]
struct LogNormalPrior1DParameters {
    mu: f64,
    sigma: f64,
}

impl From<LogNormalPrior1D> for LogNormalPrior1DParameters {
    fn from(f: LogNormalPrior1D) -> Self {
        Self {
            mu: f.mu(),
            sigma: f.sigma(),
        }
    }
}

impl From<LogNormalPrior1DParameters> for LogNormalPrior1D {
    fn from(f: LogNormalPrior1DParameters) -> Self {
        Self::new(f.mu, f.sigma)
    }
}

/// Normal distribution of the decimal logarithm of a positive parameter
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(
    into = "Log10NormalPrior1DParameters",
    from = "Log10NormalPrior1DParameters"
)]
pub struct Log10NormalPrior1D {
    ln: LogNormalPrior1D,
}

impl Log10NormalPrior1D {
    pub fn new(mean: f64, std: f64) -> Self {
        Self::try_new(mean, std).expect("mean must be finite, std must be positive")
    }

    pub fn try_new(mean: f64, std: f64) -> Result<Self, PriorError> {
        Ok(Self {
            ln: LogNormalPrior1D::try_new(mean * LN_10, std * LN_10)?,
        })
    }
}

impl Prior1DTrait for Log10NormalPrior1D {
    fn ppf(&self, u: f64) -> f64 {
        self.ln.ppf(u)
    }

    fn ln_pdf(&self, x: f64) -> f64 {
        self.ln.ln_pdf(x)
    }

    fn support(&self) -> (f64, f64) {
        self.ln.support()
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "Log10NormalPrior1D")]
struct Log10NormalPrior1DParameters {
    mean: f64,
    std: f64,
}

impl From<Log10NormalPrior1D> for Log10NormalPrior1DParameters {
    fn from(f: Log10NormalPrior1D) -> Self {
        Self {
            mean: f.ln.mu() / LN_10,
            std: f.ln.sigma() / LN_10,
        }
    }
}

impl From<Log10NormalPrior1DParameters> for Log10NormalPrior1D {
    fn from(f: Log10NormalPrior1DParameters) -> Self {
        Self::new(f.mean, f.std)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(
    into = "TruncNormalPrior1DParameters",
    from = "TruncNormalPrior1DParameters"
)]
pub struct TruncNormalPrior1D {
    normal: NormalPrior1D,
    cuts: std::ops::RangeInclusive<NotNan<f64>>,
    ln_mass: NotNan<f64>,
}

impl TruncNormalPrior1D {
    pub fn new(mean: f64, std: f64, lo_cut: f64, hi_cut: f64) -> Self {
        Self::try_new(mean, std, lo_cut, hi_cut)
            .expect("mean must be finite, std must be positive, lo_cut < hi_cut")
    }

    pub fn try_new(mean: f64, std: f64, lo_cut: f64, hi_cut: f64) -> Result<Self, PriorError> {
        let normal = NormalPrior1D::try_new(mean, std)?;
        let lo = not_nan(lo_cut, "truncated normal", "lo_cut must be finite")?;
        let hi = not_nan(hi_cut, "truncated normal", "hi_cut must be finite")?;
        let mass = if lo.into_inner() > 0.0 {
            norm_cdf(-lo.into_inner()) - norm_cdf(-hi.into_inner())
        } else {
            norm_cdf(hi.into_inner()) - norm_cdf(lo.into_inner())
        };
        let ln_mass = positive(
            mass,
            "truncated normal",
            "hi_cut must be larger than lo_cut",
        )?
        .into_inner()
        .ln();
        Ok(Self {
            normal,
            cuts: lo..=hi,
            ln_mass: NotNan::new(ln_mass).expect("mass is positive"),
        })
    }

    fn lo_cut(&self) -> f64 {
        self.cuts.start().into_inner()
    }

    fn hi_cut(&self) -> f64 {
        self.cuts.end().into_inner()
    }
}

impl Prior1DTrait for TruncNormalPrior1D {
    fn ppf(&self, u: f64) -> f64 {
        let (lo, hi) = (self.lo_cut(), self.hi_cut());
        // Work in the closer tail to keep precision for one-sided cuts far from the mean
        let z = if lo > 0.0 {
            let (sf_lo, sf_hi) = (norm_cdf(-lo), norm_cdf(-hi));
            -norm_ppf(sf_lo - u * (sf_lo - sf_hi))
        } else {
            let (cdf_lo, cdf_hi) = (norm_cdf(lo), norm_cdf(hi));
            norm_ppf(cdf_lo + u * (cdf_hi - cdf_lo))
        };
        self.normal.mean() + self.normal.std() * z.clamp(lo, hi)
    }

    fn ln_pdf(&self, x: f64) -> f64 {
        let z = (x - self.normal.mean()) / self.normal.std();
        match NotNan::new(z) {
            Ok(z) if self.cuts.contains(&z) => {
                norm_ln_pdf(z.into_inner()) - self.normal.std().ln() - self.ln_mass.into_inner()
            }
            _ => f64::NEG_INFINITY,
        }
    }

    fn support(&self) -> (f64, f64) {
        (
            self.normal.mean() + self.lo_cut() * self.normal.std(),
            self.normal.mean() + self.hi_cut() * self.normal.std(),
        )
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "TruncNormalPrior1D")]
struct TruncNormalPrior1DParameters {
    mean: f64,
    std: f64,
    lo_cut: f64,
    hi_cut: f64,
}

impl From<TruncNormalPrior1D> for TruncNormalPrior1DParameters {
    fn from(f: TruncNormalPrior1D) -> Self {
        Self {
            mean: f.normal.mean(),
            std: f.normal.std(),
            lo_cut: f.lo_cut(),
            hi_cut: f.hi_cut(),
        }
    }
}

impl From<TruncNormalPrior1DParameters> for TruncNormalPrior1D {
    fn from(f: TruncNormalPrior1DParameters) -> Self {
        Self::new(f.mean, f.std, f.lo_cut, f.hi_cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn check_density_integrates_to_one(prior: &Prior1D, lo: f64, hi: f64) {
        let n = 200_000;
        let dx = (hi - lo) / n as f64;
        let total: f64 = (0..n)
            .map(|i| prior.ln_pdf(lo + (i as f64 + 0.5) * dx).exp() * dx)
            .sum();
        assert_relative_eq!(total, 1.0, max_relative = 1e-3);
    }

    #[test]
    fn uniform() {
        let prior = Prior1D::uniform(-1.0, 3.0);
        assert_relative_eq!(prior.ppf(0.0), -1.0);
        assert_relative_eq!(prior.ppf(0.25), 0.0);
        assert_relative_eq!(prior.ppf(1.0), 3.0);
        assert_relative_eq!(prior.ln_pdf(2.0), -f64::ln(4.0));
        assert_eq!(prior.ln_pdf(3.5), f64::NEG_INFINITY);
        assert_eq!(prior.ln_pdf(f64::NAN), f64::NEG_INFINITY);
        assert_eq!(prior.support(), (-1.0, 3.0));
    }

    #[test]
    fn uniform_rejects_empty_range() {
        assert!(matches!(
            UniformPrior1D::try_new(1.0, 1.0),
            Err(PriorError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn normal_quantiles() {
        let prior = Prior1D::normal(5.0, 2.0);
        assert_relative_eq!(prior.ppf(0.5), 5.0, epsilon = 1e-12);
        assert_relative_eq!(prior.ppf(0.841_344_746_068_542_9), 7.0, epsilon = 1e-9);
        check_density_integrates_to_one(&prior, -15.0, 25.0);
    }

    #[test]
    fn log_normal_median() {
        // thetaE default, median 1 mas
        let prior = Prior1D::log_normal(0.0, 1.0);
        assert_relative_eq!(prior.ppf(0.5), 1.0, epsilon = 1e-12);
        assert_eq!(prior.ln_pdf(-1.0), f64::NEG_INFINITY);
        check_density_integrates_to_one(&prior, 0.0, 200.0);
    }

    #[test]
    fn log10_normal_matches_log_normal() {
        let log10 = Prior1D::log10_normal(-0.2, 0.3);
        let ln = Prior1D::log_normal(-0.2 * LN_10, 0.3 * LN_10);
        for u in [0.01, 0.3, 0.5, 0.9] {
            assert_relative_eq!(log10.ppf(u), ln.ppf(u), max_relative = 1e-12);
        }
        assert_relative_eq!(log10.ppf(0.5), 10_f64.powf(-0.2), max_relative = 1e-12);
    }

    #[test]
    fn trunc_normal_stays_within_cuts() {
        let prior = Prior1D::trunc_normal(0.1126, 0.0213, (0.05 - 0.1126) / 0.0213, 90.0);
        let (lo, _hi) = prior.support();
        assert_relative_eq!(lo, 0.05, max_relative = 1e-12);
        for i in 0..=100 {
            let x = prior.ppf(i as f64 / 100.0);
            assert!(x >= 0.05 - 1e-12, "{x}");
        }
        assert!(prior.ppf(0.5) > 0.1126);
        check_density_integrates_to_one(&prior, 0.0, 0.5);
    }

    #[test]
    fn trunc_normal_one_sided_positive_cut() {
        let prior = Prior1D::trunc_normal(0.0, 1.0, 3.0, 5.0);
        let x = prior.ppf(0.5);
        assert!(x > 3.0 && x < 5.0, "{x}");
        assert_relative_eq!(prior.ppf(0.0), 3.0, epsilon = 1e-9);
        check_density_integrates_to_one(&prior, 3.0, 5.0);
    }

    #[test]
    fn trunc_normal_with_bounds_clips_mean() {
        let prior = Prior1D::trunc_normal_with_bounds(-1.0, 2.0, 0.0, 10.0).unwrap();
        match &prior {
            Prior1D::TruncNormal(p) => {
                assert_relative_eq!(p.normal.mean(), 0.0);
                assert_relative_eq!(p.lo_cut(), -0.02);
                assert_relative_eq!(p.hi_cut(), 5.0);
            }
            _ => panic!("wrong variant"),
        }
        assert!(Prior1D::trunc_normal_with_bounds(0.0, 1.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn serialization() {
        for prior in [
            Prior1D::uniform(0.0, 100.0),
            Prior1D::normal(1.0, 0.5),
            Prior1D::log_normal(0.0, 1.0),
            Prior1D::log10_normal(-0.2, 0.3),
            Prior1D::trunc_normal(-0.2, 0.3, -4.0, 4.0),
        ] {
            let json = serde_json::to_string(&prior).unwrap();
            let restored: Prior1D = serde_json::from_str(&json).unwrap();
            for u in [0.1, 0.5, 0.9] {
                assert_relative_eq!(prior.ppf(u), restored.ppf(u), max_relative = 1e-12);
            }
        }
    }
}
