use crate::error::ModelError;
use crate::physics::require_positive;

use std::f64::consts::{FRAC_PI_2, PI};

/// Number of Simpson intervals used by [fspl_amplification]
const FSPL_INTERVALS: usize = 256;

/// Point-source point-lens magnification
///
/// `u` is the lens-source separation in units of the Einstein radius.
#[inline]
pub fn pspl_amplification(u: f64) -> f64 {
    let u2 = u * u;
    (u2 + 2.0) / (u * f64::sqrt(u2 + 4.0))
}

/// Uniform finite-source point-lens magnification
///
/// `rho` is the angular source radius in units of the Einstein radius, see [FiniteSource].
pub fn fspl_amplification(u: f64, rho: f64) -> Result<f64, ModelError> {
    Ok(FiniteSource::new(rho)?.amplification(u))
}

/// Uniformly bright source disk lensed by a point mass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FiniteSource {
    rho: f64,
}

impl FiniteSource {
    /// `rho` is the angular source radius in units of the Einstein radius
    pub fn new(rho: f64) -> Result<Self, ModelError> {
        Ok(Self {
            rho: require_positive("radius", rho)?,
        })
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Magnification at lens-source separation `u`
    ///
    /// The image area is integrated analytically along rays from the lens and numerically over
    /// the polar angle.
    pub fn amplification(&self, u: f64) -> f64 {
        finite_source_integral(u.abs(), self.rho)
    }
}

fn finite_source_integral(u: f64, rho: f64) -> f64 {
    // Antiderivative of 2 r A(r) = 2 (r^2 + 2) / sqrt(r^2 + 4) is r sqrt(r^2 + 4)
    let primitive = |r: f64| r * f64::sqrt(r * r + 4.0);

    let integral = if u <= rho {
        simpson(0.0, PI, FSPL_INTERVALS, |theta| {
            let (sin_t, cos_t) = theta.sin_cos();
            let r = u * cos_t + f64::sqrt((rho * rho - u * u * sin_t * sin_t).max(0.0));
            primitive(r)
        })
    } else {
        // sin(theta) = (rho / u) sin(phi) removes the square-root singularity at the
        // tangent direction
        let ratio = rho / u;
        simpson(0.0, FRAC_PI_2, FSPL_INTERVALS, |phi| {
            let (sin_p, cos_p) = phi.sin_cos();
            let cos_t = f64::sqrt(1.0 - ratio * ratio * sin_p * sin_p);
            let half_chord = rho * cos_p;
            let r_far = u * cos_t + half_chord;
            let r_near = u * cos_t - half_chord;
            (primitive(r_far) - primitive(r_near)) * ratio * cos_p / cos_t
        })
    };
    integral / (PI * rho * rho)
}

/// Apparent shift of the light centroid of an unresolved point-lens image pair
///
/// `u` is the source position relative to the lens in Einstein radii, the result is in the
/// same units as `theta_e`, pointing away from the lens.
#[inline]
pub fn centroid_shift(u: [f64; 2], theta_e: f64) -> [f64; 2] {
    let u2 = u[0] * u[0] + u[1] * u[1];
    let factor = theta_e / (u2 + 2.0);
    [factor * u[0], factor * u[1]]
}

fn simpson(a: f64, b: f64, n: usize, f: impl Fn(f64) -> f64) -> f64 {
    debug_assert!(n % 2 == 0);
    let h = (b - a) / n as f64;
    let inner: f64 = (1..n)
        .map(|i| {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            weight * f(a + h * i as f64)
        })
        .sum();
    (f(a) + f(b) + inner) * h / 3.0
}
