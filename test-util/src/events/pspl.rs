use crate::events::noise::gaussian_noise;
use crate::events::types::TripleArray;

use ndarray::Array1;

/// Point-source point-lens light curve without parallax
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PsplLightCurve {
    pub t0: f64,
    pub u0_amp: f64,
    pub t_e: f64,
    /// Source magnitude
    pub mag_src: f64,
    /// Source flux fraction of the baseline
    pub b_sff: f64,
}

impl PsplLightCurve {
    pub fn amplification(&self, t: f64) -> f64 {
        let tau = (t - self.t0) / self.t_e;
        let u2 = self.u0_amp * self.u0_amp + tau * tau;
        (u2 + 2.0) / f64::sqrt(u2 * (u2 + 4.0))
    }

    pub fn magnitude(&self, t: f64) -> f64 {
        let flux_src = 10f64.powf(-0.4 * self.mag_src);
        let flux_blend = flux_src * (1.0 - self.b_sff) / self.b_sff;
        -2.5 * f64::log10(flux_src * self.amplification(t) + flux_blend)
    }

    /// Magnitudes at `t` with normal noise of `mag_err`
    pub fn observe(&self, t: Array1<f64>, mag_err: f64, seed: u64) -> TripleArray {
        let noise = gaussian_noise(t.len(), mag_err, seed);
        let mag = t.mapv(|t| self.magnitude(t)) + noise;
        let err = Array1::from_elem(t.len(), mag_err);
        (t, mag, err)
    }
}
