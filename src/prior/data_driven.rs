//! Priors whose ranges are estimated from the observations

use crate::data::DataSample;
use crate::error::PriorError;
use crate::physics::constants::DAYS_PER_YEAR;
use crate::prior::Prior1D;
use crate::prior::prior_1d::{TruncNormalPrior1D, UniformPrior1D};

use ndarray::{ArrayView1, Zip};

/// Source parallax distribution of bulge sources, mas
const PI_S_MEAN: f64 = 0.1126;
const PI_S_STD: f64 = 0.0213;
/// Sources closer than 20 kpc
const PI_S_MIN: f64 = 0.05;

/// Uniform `t0` prior around the brightest part of a light curve
///
/// Takes the time range of the points brighter than 20% of the magnitude amplitude below the
/// peak and pads it by 40% to allow for gaps.
pub fn t0_prior(t: ArrayView1<f64>, mag: ArrayView1<f64>) -> Result<Prior1D, PriorError> {
    if t.is_empty() || t.len() != mag.len() {
        return Err(PriorError::InsufficientData("t0".into()));
    }
    let mut mag_ds = DataSample::from(mag);
    let mag_min = mag_ds.get_min();
    let threshold = mag_min + 0.2 * (mag_ds.get_max() - mag_min);
    let (mut t_min, mut t_max) = Zip::from(&t).and(&mag).fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), &t, &m| {
            if m < threshold {
                (lo.min(t), hi.max(t))
            } else {
                (lo, hi)
            }
        },
    );
    if t_min > t_max {
        // Flat light curve, nothing is brighter than the threshold
        let mut t_ds = DataSample::from(t);
        t_min = t_ds.get_min();
        t_max = t_ds.get_max();
    }
    // Padding of the upper limit uses the already padded lower one
    t_min -= 0.4 * (t_max - t_min);
    t_max += 0.4 * (t_max - t_min);
    Ok(UniformPrior1D::try_new(t_min, t_max)?.into())
}

/// Truncated normal baseline magnitude prior from sigma-clipped statistics of the data
pub fn mag_base_prior(mag: ArrayView1<f64>) -> Result<Prior1D, PriorError> {
    if mag.is_empty() {
        return Err(PriorError::InsufficientData("mag_base".into()));
    }
    let (mean, _median, std) = DataSample::from(mag).sigma_clipped_stats(2.0, 4.0, 5);
    Ok(TruncNormalPrior1D::try_new(mean, 3.0 * std, -5.0, 5.0)?.into())
}

/// Uniform source magnitude prior, allows for negative blending
pub fn mag_src_prior(mag: ArrayView1<f64>) -> Result<Prior1D, PriorError> {
    if mag.is_empty() {
        return Err(PriorError::InsufficientData("mag_src".into()));
    }
    let (mean, _median, _std) = DataSample::from(mag).sigma_clipped_stats(2.0, 4.0, 5);
    Ok(UniformPrior1D::try_new(mean - 1.0, mean + 5.0)?.into())
}

/// Uniform prior for the source position at `t0`, arcsec
pub fn xs0_prior(pos: ArrayView1<f64>) -> Result<Prior1D, PriorError> {
    if pos.is_empty() {
        return Err(PriorError::InsufficientData("xS0".into()));
    }
    let mut ds = DataSample::from(pos);
    let std = ds.get_std();
    Ok(UniformPrior1D::try_new(ds.get_min() - 5.0 * std, ds.get_max() + 5.0 * std)?.into())
}

/// Slope of a straight line fit and its standard error
///
/// The error is scaled by the residual variance with `n - 4` degrees of freedom, the
/// convention of `numpy.polyfit(..., cov=True)`.
pub fn linear_fit_slope(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Option<(f64, f64)> {
    let n = x.len();
    if n != y.len() || n <= 4 {
        return None;
    }
    let n_f = n as f64;
    let x_mean = x.sum() / n_f;
    let y_mean = y.sum() / n_f;
    let (sxx, sxy) = Zip::from(&x)
        .and(&y)
        .fold((0.0, 0.0), |(sxx, sxy), &x, &y| {
            let dx = x - x_mean;
            (sxx + dx * dx, sxy + dx * (y - y_mean))
        });
    if sxx <= 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let rss = Zip::from(&x)
        .and(&y)
        .fold(0.0, |acc, &x, &y| acc + (y - intercept - slope * x).powi(2));
    let slope_err = f64::sqrt(rss / (n_f - 4.0) / sxx);
    Some((slope, slope_err))
}

/// Uniform source proper motion prior, mas/yr
///
/// `t` is in days, `pos` in arcsec. The range is `scale` standard errors of the linear-fit
/// velocity on both sides.
pub fn mus_prior(
    t: ArrayView1<f64>,
    pos: ArrayView1<f64>,
    scale: f64,
) -> Result<Prior1D, PriorError> {
    let t_yr = t.mapv(|t| t / DAYS_PER_YEAR);
    let (slope, slope_err) = linear_fit_slope(t_yr.view(), pos)
        .ok_or_else(|| PriorError::InsufficientData("muS".into()))?;
    let vel = slope * 1e3;
    let vel_err = slope_err * 1e3;
    Ok(UniformPrior1D::try_new(vel - scale * vel_err, vel + scale * vel_err)?.into())
}

/// Source parallax prior of bulge sources, mas
pub fn pi_s_prior() -> Prior1D {
    Prior1D::trunc_normal(
        PI_S_MEAN,
        PI_S_STD,
        (PI_S_MIN - PI_S_MEAN) / PI_S_STD,
        90.0,
    )
}
