use crate::physics::constants::{J2000, MJD_TO_JD};

/// Geocentric equatorial position of the Sun in AU
///
/// Low-precision solar coordinates (about 0.01 deg between 1950 and 2050), sufficient for
/// annual parallax of microlensing events.
pub fn sun_position(mjd: f64) -> [f64; 3] {
    let n = mjd + MJD_TO_JD - J2000;
    let mean_longitude = (280.460 + 0.985_647_4 * n).to_radians();
    let mean_anomaly = (357.528 + 0.985_600_3 * n).to_radians();
    let ecliptic_longitude = mean_longitude
        + (1.915 * mean_anomaly.sin() + 0.020 * (2.0 * mean_anomaly).sin()).to_radians();
    let distance =
        1.000_14 - 0.016_71 * mean_anomaly.cos() - 0.000_14 * (2.0 * mean_anomaly).cos();
    let obliquity = (23.439 - 4.0e-7 * n).to_radians();

    let (sin_l, cos_l) = ecliptic_longitude.sin_cos();
    [
        distance * cos_l,
        distance * obliquity.cos() * sin_l,
        distance * obliquity.sin() * sin_l,
    ]
}

/// Apparent East and North displacement of a star caused by unit parallax
///
/// The heliocentric observer sees a star at distance `d` displaced by the projection of the
/// geocentric Sun vector onto the sky plane divided by `d`. Multiply by the parallax to get
/// the offset in the same units.
pub fn parallax_factors(mjd: f64, ra_deg: f64, dec_deg: f64) -> [f64; 2] {
    let [x, y, z] = sun_position(mjd);
    let (sin_a, cos_a) = ra_deg.to_radians().sin_cos();
    let (sin_d, cos_d) = dec_deg.to_radians().sin_cos();
    let east = -x * sin_a + y * cos_a;
    let north = -x * sin_d * cos_a - y * sin_d * sin_a + z * cos_d;
    [east, north]
}

/// Sky position the parallax factors are computed for
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyPosition {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl SkyPosition {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }

    #[inline]
    pub fn parallax_factors(&self, mjd: f64) -> [f64; 2] {
        parallax_factors(mjd, self.ra_deg, self.dec_deg)
    }
}
