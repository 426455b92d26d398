/// Julian year in days
pub const DAYS_PER_YEAR: f64 = 365.25;

/// 4G / (c^2 AU) in mas per solar mass: thetaE^2 = KAPPA * mL * piRel
pub const KAPPA: f64 = 8.1459;

/// Parallax in mas of an object at 1 pc
pub const MAS_PC: f64 = 1000.0;

/// Offset between Julian date and modified Julian date
pub const MJD_TO_JD: f64 = 2_400_000.5;

/// Julian date of J2000.0
pub const J2000: f64 = 2_451_545.0;

pub const MAS_PER_ARCSEC: f64 = 1000.0;
