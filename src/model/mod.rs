//! Microlensing event models
//!
//! A model is built from a [ModelKind] and a set of named [ModelParams], it predicts magnitudes
//! in every photometric band and, for astrometric models, the position of the light centroid.

use crate::error::ModelError;
use crate::special::LN_SQRT_2PI;

use enum_dispatch::enum_dispatch;
use ndarray::{Array1, Array2, ArrayView1, Zip};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod fspl;
pub use fspl::FsplPhot;

mod geometry;

pub mod params;
pub use params::{ModelParams, split_param_filter_index};

mod psbl;
pub use psbl::PsblPhot;

mod pspl;
pub use pspl::PsplPhot;

mod pspl_astrom;
pub use pspl_astrom::PsplPhotAstrom;

/// What a model describes
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct ModelFlags {
    pub photometry: bool,
    pub astrometry: bool,
    pub parallax: bool,
    pub finite_source: bool,
    pub binary: bool,
}

/// Natural logarithm of the normal likelihood of a single measurement
#[inline]
fn ln_gaussian(observed: f64, model: f64, err: f64) -> f64 {
    let z = (observed - model) / err;
    -0.5 * z * z - err.ln() - LN_SQRT_2PI
}

#[enum_dispatch]
pub trait MicrolensModelTrait {
    fn kind(&self) -> ModelKind;

    /// Magnification of the source at time `t` (MJD)
    fn amplification(&self, t: f64) -> f64;

    /// Number of photometric bands, zero for astrometry-only models
    fn n_bands(&self) -> usize;

    /// Magnitude in `band` (0-based) at time `t`
    fn photometry(&self, t: f64, band: usize) -> Result<f64, ModelError>;

    /// East and North position of the light centroid in arcsec
    ///
    /// `band` is the photometric band the astrometric set is observed in. Lenses are dark, so
    /// the centroid doesn't depend on it for now.
    fn astrometry(&self, t: f64, band: usize) -> Result<[f64; 2], ModelError>;

    /// Values of the derived ("additional") parameters, ordered as
    /// [ModelKind::additional_param_names]
    fn derived_params(&self) -> Vec<(&'static str, f64)>;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn flags(&self) -> ModelFlags {
        self.kind().flags()
    }

    fn photometry_array(
        &self,
        t: ArrayView1<f64>,
        band: usize,
    ) -> Result<Array1<f64>, ModelError> {
        t.iter().map(|&t| self.photometry(t, band)).collect()
    }

    /// Centroid positions as a `(t.len(), 2)` array
    fn astrometry_array(
        &self,
        t: ArrayView1<f64>,
        band: usize,
    ) -> Result<Array2<f64>, ModelError> {
        let mut positions = Array2::zeros((t.len(), 2));
        for (mut row, &t) in positions.outer_iter_mut().zip(t.iter()) {
            let [x, y] = self.astrometry(t, band)?;
            row[0] = x;
            row[1] = y;
        }
        Ok(positions)
    }

    /// Gaussian log-likelihood of a photometric light curve
    ///
    /// `sum(-0.5 * ((mag - model)^2 / mag_err^2 + ln(2 pi mag_err^2)))`
    fn log_likely_photometry(
        &self,
        t: ArrayView1<f64>,
        mag: ArrayView1<f64>,
        mag_err: ArrayView1<f64>,
        band: usize,
    ) -> Result<f64, ModelError> {
        let model = self.photometry_array(t, band)?;
        Ok(Zip::from(&model)
            .and(mag)
            .and(mag_err)
            .fold(0.0, |acc, &model, &mag, &err| {
                acc + ln_gaussian(mag, model, err)
            }))
    }

    /// Gaussian log-likelihood of an astrometric set, both axes are independent
    fn log_likely_astrometry(
        &self,
        t: ArrayView1<f64>,
        x: ArrayView1<f64>,
        y: ArrayView1<f64>,
        x_err: ArrayView1<f64>,
        y_err: ArrayView1<f64>,
        band: usize,
    ) -> Result<f64, ModelError> {
        let model = self.astrometry_array(t, band)?;
        Ok(Zip::from(model.rows())
            .and(x)
            .and(y)
            .and(x_err)
            .and(y_err)
            .fold(0.0, |acc, pos, &x, &y, &x_err, &y_err| {
                acc + ln_gaussian(x, pos[0], x_err) + ln_gaussian(y, pos[1], y_err)
            }))
    }
}

/// Microlensing model with all parameters set
///
/// Consider to import [MicrolensModelTrait] as well
#[enum_dispatch(MicrolensModelTrait)]
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum MicrolensModel {
    PsplPhot,
    PsplPhotAstrom,
    FsplPhot,
    PsblPhot,
}

/// Model class: parameterisation and capabilities, without parameter values
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(tag = "model")]
#[non_exhaustive]
pub enum ModelKind {
    /// Point-source point-lens photometry parameterised with source magnitudes
    PsplPhot { parallax: bool },
    /// Point-source point-lens photometry parameterised with baseline magnitudes
    PsplPhotBase { parallax: bool },
    /// Point-source point-lens photometry and astrometry with physical parameters: lens mass,
    /// distances and proper motions
    PsplPhotAstromPhys { parallax: bool },
    /// Point-source point-lens photometry and astrometry with observable parameters: Einstein
    /// time, Einstein radius and microlensing parallax
    PsplPhotAstromObs { parallax: bool },
    /// Astrometry-only variant of [ModelKind::PsplPhotAstromObs]
    PsplAstromObs { parallax: bool },
    /// Uniform finite-source point-lens photometry
    FsplPhot { parallax: bool },
    /// Point-source binary-lens photometry
    PsblPhot { parallax: bool },
}

const T0_U0_TE: [&str; 3] = ["t0", "u0_amp", "tE"];
const PI_E: [&str; 2] = ["piE_E", "piE_N"];
const OBS_ASTROM: [&str; 11] = [
    "t0", "u0_amp", "tE", "thetaE", "piS", "piE_E", "piE_N", "xS0_E", "xS0_N", "muS_E", "muS_N",
];
const PHYS_ASTROM: [&str; 11] = [
    "mL", "t0", "beta", "dL", "dL_dS", "xS0_E", "xS0_N", "muL_E", "muL_N", "muS_E", "muS_N",
];
const OBS_DERIVED: [&str; 9] = [
    "mL", "dL", "dS", "piL", "piRel", "muL_E", "muL_N", "muRel_E", "muRel_N",
];
const PHYS_DERIVED: [&str; 11] = [
    "tE", "thetaE", "piE_E", "piE_N", "u0_amp", "muRel_E", "muRel_N", "dS", "piS", "piL",
    "piRel",
];

impl ModelKind {
    /// Every model class, without and with parallax
    pub const ALL: [ModelKind; 14] = [
        Self::PsplPhot { parallax: false },
        Self::PsplPhot { parallax: true },
        Self::PsplPhotBase { parallax: false },
        Self::PsplPhotBase { parallax: true },
        Self::PsplPhotAstromPhys { parallax: false },
        Self::PsplPhotAstromPhys { parallax: true },
        Self::PsplPhotAstromObs { parallax: false },
        Self::PsplPhotAstromObs { parallax: true },
        Self::PsplAstromObs { parallax: false },
        Self::PsplAstromObs { parallax: true },
        Self::FsplPhot { parallax: false },
        Self::FsplPhot { parallax: true },
        Self::PsblPhot { parallax: false },
        Self::PsblPhot { parallax: true },
    ];

    pub fn name(&self) -> &'static str {
        match *self {
            Self::PsplPhot { parallax: false } => "PsplPhot",
            Self::PsplPhot { parallax: true } => "PsplPhotPar",
            Self::PsplPhotBase { parallax: false } => "PsplPhotBase",
            Self::PsplPhotBase { parallax: true } => "PsplPhotBasePar",
            Self::PsplPhotAstromPhys { parallax: false } => "PsplPhotAstromPhys",
            Self::PsplPhotAstromPhys { parallax: true } => "PsplPhotAstromParPhys",
            Self::PsplPhotAstromObs { parallax: false } => "PsplPhotAstromObs",
            Self::PsplPhotAstromObs { parallax: true } => "PsplPhotAstromParObs",
            Self::PsplAstromObs { parallax: false } => "PsplAstromObs",
            Self::PsplAstromObs { parallax: true } => "PsplAstromParObs",
            Self::FsplPhot { parallax: false } => "FsplPhot",
            Self::FsplPhot { parallax: true } => "FsplPhotPar",
            Self::PsblPhot { parallax: false } => "PsblPhot",
            Self::PsblPhot { parallax: true } => "PsblPhotPar",
        }
    }

    pub fn parallax(&self) -> bool {
        match *self {
            Self::PsplPhot { parallax }
            | Self::PsplPhotBase { parallax }
            | Self::PsplPhotAstromPhys { parallax }
            | Self::PsplPhotAstromObs { parallax }
            | Self::PsplAstromObs { parallax }
            | Self::FsplPhot { parallax }
            | Self::PsblPhot { parallax } => parallax,
        }
    }

    pub fn flags(&self) -> ModelFlags {
        ModelFlags {
            photometry: !matches!(self, Self::PsplAstromObs { .. }),
            astrometry: matches!(
                self,
                Self::PsplPhotAstromPhys { .. }
                    | Self::PsplPhotAstromObs { .. }
                    | Self::PsplAstromObs { .. }
            ),
            parallax: self.parallax(),
            finite_source: matches!(self, Self::FsplPhot { .. }),
            binary: matches!(self, Self::PsblPhot { .. }),
        }
    }

    /// Names of the band-independent fit parameters
    pub fn fitter_param_names(&self) -> Vec<&'static str> {
        let pi_e: &[&str] = if self.parallax() { &PI_E } else { &[] };
        match self {
            Self::PsplPhot { .. } | Self::PsplPhotBase { .. } => [&T0_U0_TE[..], pi_e].concat(),
            Self::FsplPhot { .. } => [&T0_U0_TE[..], pi_e, &["radius"][..]].concat(),
            Self::PsblPhot { .. } => [&T0_U0_TE[..], pi_e, &["q", "sep", "alpha"][..]].concat(),
            Self::PsplPhotAstromPhys { .. } => PHYS_ASTROM.to_vec(),
            Self::PsplPhotAstromObs { .. } | Self::PsplAstromObs { .. } => OBS_ASTROM.to_vec(),
        }
    }

    /// Base names of the fit parameters every photometric band has, the fitter appends the
    /// 1-based band index
    pub fn phot_param_names(&self) -> &'static [&'static str] {
        match self {
            Self::PsplPhotBase { .. } => &["b_sff", "mag_base"],
            Self::PsplAstromObs { .. } => &[],
            _ => &["b_sff", "mag_src"],
        }
    }

    /// Base names of per-band parameters which may be switched off for some bands
    pub fn phot_optional_param_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Names of the derived parameters reported with the posterior
    pub fn additional_param_names(&self) -> Vec<&'static str> {
        match self {
            Self::PsplPhotAstromPhys { .. } => PHYS_DERIVED.to_vec(),
            Self::PsplPhotAstromObs { .. } | Self::PsplAstromObs { .. } => OBS_DERIVED.to_vec(),
            _ if self.parallax() => vec!["piE_amp"],
            _ => vec![],
        }
    }

    /// Build the model from parameter values
    ///
    /// `coordinates` are right ascension and declination of the event in degrees, they are
    /// required by parallax models only.
    pub fn build(
        &self,
        params: &ModelParams,
        coordinates: Option<(f64, f64)>,
    ) -> Result<MicrolensModel, ModelError> {
        let model = match *self {
            Self::PsplPhot { .. } | Self::PsplPhotBase { .. } => {
                PsplPhot::from_params(*self, params, coordinates)?.into()
            }
            Self::PsplPhotAstromPhys { .. }
            | Self::PsplPhotAstromObs { .. }
            | Self::PsplAstromObs { .. } => {
                PsplPhotAstrom::from_params(*self, params, coordinates)?.into()
            }
            Self::FsplPhot { .. } => FsplPhot::from_params(*self, params, coordinates)?.into(),
            Self::PsblPhot { .. } => PsblPhot::from_params(*self, params, coordinates)?.into(),
        };
        Ok(model)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ModelError::UnknownModel(s.to_owned()))
    }
}

fn unsupported<T>(kind: ModelKind, what: &'static str) -> Result<T, ModelError> {
    Err(ModelError::Unsupported {
        model: kind.name(),
        what,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::physics::pspl_amplification;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn pspl_params() -> ModelParams {
        ModelParams::new()
            .with("t0", 57_000.0)
            .with("u0_amp", 0.2)
            .with("tE", 40.0)
            .with("b_sff1", 1.0)
            .with("mag_src1", 19.0)
    }

    #[test]
    fn names_round_trip() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.name().parse::<ModelKind>().unwrap(), kind);
        }
        assert_eq!(
            "PSPL".parse::<ModelKind>(),
            Err(ModelError::UnknownModel("PSPL".into()))
        );
    }

    #[test]
    fn flags() {
        let flags = ModelKind::PsplAstromObs { parallax: true }.flags();
        assert!(!flags.photometry);
        assert!(flags.astrometry);
        assert!(flags.parallax);
        assert!(ModelKind::FsplPhot { parallax: false }.flags().finite_source);
        assert!(ModelKind::PsblPhot { parallax: false }.flags().binary);
    }

    #[test]
    fn param_names() {
        assert_eq!(
            ModelKind::PsplPhot { parallax: true }.fitter_param_names(),
            vec!["t0", "u0_amp", "tE", "piE_E", "piE_N"]
        );
        assert_eq!(
            ModelKind::PsblPhot { parallax: false }.fitter_param_names(),
            vec!["t0", "u0_amp", "tE", "q", "sep", "alpha"]
        );
        assert_eq!(
            ModelKind::PsplPhotBase { parallax: false }.phot_param_names(),
            &["b_sff", "mag_base"]
        );
        assert!(
            ModelKind::PsplPhot { parallax: false }
                .additional_param_names()
                .is_empty()
        );
    }

    #[test]
    fn serde_tagging() {
        let kind = ModelKind::FsplPhot { parallax: true };
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, r#"{"model":"FsplPhot","parallax":true}"#);
        assert_eq!(serde_json::from_str::<ModelKind>(&json).unwrap(), kind);
    }

    #[test]
    fn photometric_likelihood() {
        let model = ModelKind::PsplPhot { parallax: false }
            .build(&pspl_params(), None)
            .unwrap();
        let t = array![56_960.0, 57_000.0, 57_020.0];
        let mag = model.photometry_array(t.view(), 0).unwrap();
        let err = array![0.1, 0.1, 0.1];
        // Perfect fit leaves the normalisation only
        let ln_l = model
            .log_likely_photometry(t.view(), mag.view(), err.view(), 0)
            .unwrap();
        assert_relative_eq!(ln_l, 3.0 * (-(0.1_f64.ln()) - LN_SQRT_2PI));
        // One-sigma offsets cost 0.5 each
        let shifted = &mag + 0.1;
        let ln_l_shifted = model
            .log_likely_photometry(t.view(), shifted.view(), err.view(), 0)
            .unwrap();
        assert_relative_eq!(ln_l - ln_l_shifted, 1.5, max_relative = 1e-9);
        assert_relative_eq!(
            mag[1],
            19.0 - 2.5 * pspl_amplification(0.2).log10(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn photometric_model_has_no_astrometry() {
        let model = ModelKind::PsplPhot { parallax: false }
            .build(&pspl_params(), None)
            .unwrap();
        assert_eq!(
            model.astrometry(57_000.0, 0),
            Err(ModelError::Unsupported {
                model: "PsplPhot",
                what: "astrometry"
            })
        );
        assert!(model.photometry(57_000.0, 1).is_err());
    }

    #[test]
    fn parallax_needs_coordinates() {
        let params = pspl_params().with("piE_E", 0.1).with("piE_N", -0.05);
        let kind = ModelKind::PsplPhot { parallax: true };
        assert_eq!(
            kind.build(&params, None),
            Err(ModelError::MissingCoordinates("PsplPhotPar"))
        );
        let model = kind.build(&params, Some((268.0, -29.0))).unwrap();
        assert_eq!(model.derived_params()[0].0, "piE_amp");
        assert_relative_eq!(model.derived_params()[0].1, f64::hypot(0.1, 0.05));
    }
}
