//! Trajectory, blending and centroid helpers shared by the model variants

use crate::error::ModelError;
use crate::model::ModelParams;
use crate::physics::constants::{DAYS_PER_YEAR, MAS_PER_ARCSEC};
use crate::physics::{SkyPosition, centroid_shift};

/// Unit vector along `[east, north]`, East if the vector is zero
pub(super) fn unit_vector(east: f64, north: f64) -> [f64; 2] {
    let amp = f64::hypot(east, north);
    if amp > 0.0 {
        [east / amp, north / amp]
    } else {
        [1.0, 0.0]
    }
}

pub(super) use crate::physics::require_positive;

/// Sky position for parallax models, `None` otherwise
pub(super) fn sky_position(
    parallax: bool,
    coordinates: Option<(f64, f64)>,
    model: &'static str,
) -> Result<Option<SkyPosition>, ModelError> {
    if !parallax {
        return Ok(None);
    }
    coordinates
        .map(|(ra, dec)| SkyPosition::new(ra, dec))
        .map(Some)
        .ok_or(ModelError::MissingCoordinates(model))
}

#[inline]
fn parallax_offset(sky: Option<SkyPosition>, t: f64) -> [f64; 2] {
    sky.map_or([0.0, 0.0], |sky| sky.parallax_factors(t))
}

/// Source position relative to the lens in Einstein radii
///
/// `u(t) = u0 + tau e - |piE| P(t)`, where `tau = (t - t0) / tE`, `e` is the direction of the
/// relative proper motion, `u0` is perpendicular to it and `P(t)` is the parallax offset per unit
/// parallax. `u0` is `u0_amp` times `e` rotated clockwise by 90 degrees, so positive `u0_amp`
/// puts the source to the right of its motion on the sky.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Trajectory {
    pub t0: f64,
    pub t_e: f64,
    pub u0: [f64; 2],
    pub e_hat: [f64; 2],
    pub pi_e_amp: f64,
    pub sky: Option<SkyPosition>,
}

impl Trajectory {
    pub fn new(
        t0: f64,
        u0_amp: f64,
        t_e: f64,
        e_hat: [f64; 2],
        pi_e_amp: f64,
        sky: Option<SkyPosition>,
    ) -> Result<Self, ModelError> {
        let t_e = require_positive("tE", t_e)?;
        Ok(Self {
            t0,
            t_e,
            u0: [u0_amp * e_hat[1], -u0_amp * e_hat[0]],
            e_hat,
            pi_e_amp,
            sky,
        })
    }

    /// Trajectory of a photometric model from `t0`, `u0_amp`, `tE` and, with parallax,
    /// `piE_E` and `piE_N`
    ///
    /// Returns the trajectory and the parallax vector, which is zero without parallax.
    pub fn from_photometric_params(
        params: &ModelParams,
        sky: Option<SkyPosition>,
    ) -> Result<(Self, [f64; 2]), ModelError> {
        let pi_e = match sky {
            Some(_) => [params.get("piE_E")?, params.get("piE_N")?],
            None => [0.0, 0.0],
        };
        let trajectory = Self::new(
            params.get("t0")?,
            params.get("u0_amp")?,
            params.get("tE")?,
            unit_vector(pi_e[0], pi_e[1]),
            f64::hypot(pi_e[0], pi_e[1]),
            sky,
        )?;
        Ok((trajectory, pi_e))
    }

    pub fn u_vec(&self, t: f64) -> [f64; 2] {
        let tau = (t - self.t0) / self.t_e;
        let [p_e, p_n] = parallax_offset(self.sky, t);
        [
            self.u0[0] + tau * self.e_hat[0] - self.pi_e_amp * p_e,
            self.u0[1] + tau * self.e_hat[1] - self.pi_e_amp * p_n,
        ]
    }

    #[inline]
    pub fn u(&self, t: f64) -> f64 {
        let [u_e, u_n] = self.u_vec(t);
        f64::hypot(u_e, u_n)
    }
}

/// Source flux fraction and baseline magnitude of every photometric band
#[derive(Clone, Debug, PartialEq)]
pub(super) struct Blending {
    pub b_sff: Vec<f64>,
    pub mag_base: Vec<f64>,
}

impl Blending {
    /// From source magnitudes: `mag_base = mag_src + 2.5 lg(b_sff)`
    pub fn from_mag_src(b_sff: &[f64], mag_src: &[f64]) -> Result<Self, ModelError> {
        check_band_count("mag_src", b_sff.len(), mag_src.len())?;
        let b_sff = check_b_sff(b_sff)?;
        let mag_base = b_sff
            .iter()
            .zip(mag_src)
            .map(|(&b, &m)| m + 2.5 * b.log10())
            .collect();
        Ok(Self { b_sff, mag_base })
    }

    pub fn from_mag_base(b_sff: &[f64], mag_base: &[f64]) -> Result<Self, ModelError> {
        check_band_count("mag_base", b_sff.len(), mag_base.len())?;
        Ok(Self {
            b_sff: check_b_sff(b_sff)?,
            mag_base: mag_base.to_vec(),
        })
    }

    /// Per-band values of `b_sff` and either `mag_base` or `mag_src`
    pub fn from_params(params: &ModelParams, with_mag_base: bool) -> Result<Self, ModelError> {
        let b_sff = params.band("b_sff")?;
        if with_mag_base {
            Self::from_mag_base(b_sff, params.band("mag_base")?)
        } else {
            Self::from_mag_src(b_sff, params.band("mag_src")?)
        }
    }

    #[inline]
    pub fn n_bands(&self) -> usize {
        self.b_sff.len()
    }

    pub fn check_band(&self, band: usize) -> Result<(), ModelError> {
        if band < self.n_bands() {
            Ok(())
        } else {
            Err(ModelError::NoBand {
                band: band + 1,
                n_bands: self.n_bands(),
            })
        }
    }

    /// Magnitude of a band with the source magnified by `amplification`
    ///
    /// Strongly negative blending (`b_sff > 1`) can make the flux non-positive, the magnitude is
    /// NaN then.
    #[inline]
    pub fn mag(&self, amplification: f64, band: usize) -> f64 {
        let b_sff = self.b_sff[band];
        self.mag_base[band] - 2.5 * f64::log10(b_sff * amplification + 1.0 - b_sff)
    }

    pub fn mag_src(&self, band: usize) -> f64 {
        self.mag_base[band] - 2.5 * self.b_sff[band].log10()
    }
}

fn check_band_count(name: &'static str, expected: usize, actual: usize) -> Result<(), ModelError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ModelError::WrongBandCount {
            name,
            expected,
            actual,
        })
    }
}

fn check_b_sff(b_sff: &[f64]) -> Result<Vec<f64>, ModelError> {
    b_sff
        .iter()
        .map(|&b| require_positive("b_sff", b))
        .collect()
}

/// Unlensed source motion on the sky
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct SourceMotion {
    /// Position at `t0` in arcsec
    pub xs0: [f64; 2],
    /// Proper motion in mas/yr
    pub mu_s: [f64; 2],
    /// Parallax in mas
    pub pi_s: f64,
}

impl SourceMotion {
    /// Unlensed position in arcsec
    pub fn position(&self, t: f64, t0: f64, sky: Option<SkyPosition>) -> [f64; 2] {
        let dt_yr = (t - t0) / DAYS_PER_YEAR;
        let [p_e, p_n] = parallax_offset(sky, t);
        [
            self.xs0[0] + (self.mu_s[0] * dt_yr + self.pi_s * p_e) / MAS_PER_ARCSEC,
            self.xs0[1] + (self.mu_s[1] * dt_yr + self.pi_s * p_n) / MAS_PER_ARCSEC,
        ]
    }
}

/// Point-source point-lens event with a dark lens seen both in photometry and astrometry
#[derive(Clone, Debug, PartialEq)]
pub(super) struct AstrometricPspl {
    pub trajectory: Trajectory,
    pub source: SourceMotion,
    /// Angular Einstein radius in mas
    pub theta_e: f64,
}

impl AstrometricPspl {
    /// Position of the light centroid in arcsec
    pub fn centroid(&self, t: f64) -> [f64; 2] {
        let [x, y] = self
            .source
            .position(t, self.trajectory.t0, self.trajectory.sky);
        let [dx, dy] = centroid_shift(self.trajectory.u_vec(t), self.theta_e);
        [x + dx / MAS_PER_ARCSEC, y + dy / MAS_PER_ARCSEC]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn impact_parameter_is_minimal_separation() {
        let e_hat = unit_vector(0.6, 0.8);
        let trajectory = Trajectory::new(100.0, 0.3, 25.0, e_hat, 0.0, None).unwrap();
        assert_relative_eq!(trajectory.u(100.0), 0.3, max_relative = 1e-12);
        assert!(trajectory.u(99.0) > 0.3);
        assert!(trajectory.u(101.0) > 0.3);
        assert_relative_eq!(
            trajectory.u(125.0),
            f64::hypot(0.3, 1.0),
            max_relative = 1e-12
        );
    }

    #[test]
    fn sign_of_impact_parameter() {
        let plus = Trajectory::new(0.0, 0.5, 10.0, [1.0, 0.0], 0.0, None).unwrap();
        let minus = Trajectory::new(0.0, -0.5, 10.0, [1.0, 0.0], 0.0, None).unwrap();
        assert_eq!(plus.u_vec(0.0), [0.0, -0.5]);
        assert_eq!(minus.u_vec(0.0), [0.0, 0.5]);
    }

    #[test]
    fn non_positive_einstein_time() {
        assert!(Trajectory::new(0.0, 0.1, 0.0, [1.0, 0.0], 0.0, None).is_err());
        assert!(Trajectory::new(0.0, 0.1, -3.0, [1.0, 0.0], 0.0, None).is_err());
    }

    #[test]
    fn unblended_magnitude() {
        let blending = Blending::from_mag_src(&[1.0], &[19.0]).unwrap();
        assert_relative_eq!(blending.mag_base[0], 19.0);
        assert_relative_eq!(blending.mag(10.0, 0), 16.5, max_relative = 1e-12);
        assert_relative_eq!(blending.mag(1.0, 0), 19.0);
    }

    #[test]
    fn blended_magnitude() {
        let blending = Blending::from_mag_src(&[0.5], &[20.0]).unwrap();
        // Half of the baseline flux is from the source
        assert_relative_eq!(blending.mag_base[0], 20.0 - 2.5 * 2.0_f64.log10());
        assert_relative_eq!(blending.mag_src(0), 20.0, max_relative = 1e-12);
        // A = 3 triples the source flux: total = 0.5 * 3 + 0.5 = 2 baseline fluxes
        assert_relative_eq!(
            blending.mag(3.0, 0),
            blending.mag_base[0] - 2.5 * 2.0_f64.log10(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn blending_errors() {
        assert_eq!(
            Blending::from_mag_src(&[1.0, 0.5], &[19.0]),
            Err(ModelError::WrongBandCount {
                name: "mag_src",
                expected: 2,
                actual: 1
            })
        );
        assert!(Blending::from_mag_base(&[0.0], &[19.0]).is_err());
        let blending = Blending::from_mag_base(&[1.0], &[19.0]).unwrap();
        assert_eq!(
            blending.check_band(1),
            Err(ModelError::NoBand {
                band: 2,
                n_bands: 1
            })
        );
    }

    #[test]
    fn parallax_requires_coordinates() {
        assert_eq!(sky_position(false, None, "PsplPhot").unwrap(), None);
        assert!(sky_position(true, Some((268.0, -29.0)), "PsplPhotPar").unwrap().is_some());
        assert_eq!(
            sky_position(true, None, "PsplPhotPar"),
            Err(ModelError::MissingCoordinates("PsplPhotPar"))
        );
    }
}
