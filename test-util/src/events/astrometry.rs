use crate::events::noise::gaussian_noise;

use ndarray::Array1;

const DAYS_PER_YEAR: f64 = 365.25;
const MAS_PER_ARCSEC: f64 = 1e3;

/// Time, East and North positions in arcsec and their errors
pub type AstrometryArrays = (
    Array1<f64>,
    Array1<f64>,
    Array1<f64>,
    Array1<f64>,
    Array1<f64>,
);

/// Unlensed source moving along a straight line
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearMotion {
    /// Reference epoch, MJD
    pub t0: f64,
    /// Position at `t0`, arcsec
    pub x0: [f64; 2],
    /// Proper motion, mas/yr
    pub mu: [f64; 2],
}

impl LinearMotion {
    pub fn position(&self, t: f64) -> [f64; 2] {
        let dt = (t - self.t0) / DAYS_PER_YEAR / MAS_PER_ARCSEC;
        [self.x0[0] + self.mu[0] * dt, self.x0[1] + self.mu[1] * dt]
    }

    /// Positions at `t` with normal noise of `err` arcsec along both axes
    pub fn observe(&self, t: Array1<f64>, err: f64, seed: u64) -> AstrometryArrays {
        let n = t.len();
        let x = t.mapv(|t| self.position(t)[0]) + gaussian_noise(n, err, seed);
        let y = t.mapv(|t| self.position(t)[1]) + gaussian_noise(n, err, seed + 1);
        let err = Array1::from_elem(n, err);
        (t, x, y, err.clone(), err)
    }
}
