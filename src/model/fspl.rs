use crate::error::ModelError;
use crate::model::geometry::{Blending, Trajectory, sky_position};
use crate::model::{MicrolensModelTrait, ModelKind, ModelParams, unsupported};
use crate::physics::FiniteSource;

use macro_const::macro_const;

macro_const! {
    const DOC: &str = r#"
Finite-source point-lens photometric model

Same as the point-source point-lens model, but the source is a uniformly bright disk of radius
`radius` in units of the Einstein radius. The magnification is the point-lens magnification
averaged over the disk, it is finite for any lens-source separation, so the model describes
events where the lens transits the source.

- Fit parameters: `t0`, `u0_amp`, `tE`, `piE_E`, `piE_N` with parallax, `radius`
- Per-band parameters: `b_sff`, `mag_src`
"#;
}

#[doc = DOC!()]
#[derive(Clone, Debug, PartialEq)]
pub struct FsplPhot {
    kind: ModelKind,
    trajectory: Trajectory,
    blending: Blending,
    source: FiniteSource,
    pi_e: [f64; 2],
}

impl FsplPhot {
    pub(super) fn from_params(
        kind: ModelKind,
        params: &ModelParams,
        coordinates: Option<(f64, f64)>,
    ) -> Result<Self, ModelError> {
        let sky = sky_position(kind.parallax(), coordinates, kind.name())?;
        let (trajectory, pi_e) = Trajectory::from_photometric_params(params, sky)?;
        Ok(Self {
            kind,
            trajectory,
            blending: Blending::from_params(params, false)?,
            source: FiniteSource::new(params.get("radius")?)?,
            pi_e,
        })
    }

    pub fn doc() -> &'static str {
        DOC
    }
}

impl MicrolensModelTrait for FsplPhot {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn amplification(&self, t: f64) -> f64 {
        self.source.amplification(self.trajectory.u(t))
    }

    fn n_bands(&self) -> usize {
        self.blending.n_bands()
    }

    fn photometry(&self, t: f64, band: usize) -> Result<f64, ModelError> {
        self.blending.check_band(band)?;
        Ok(self.blending.mag(self.amplification(t), band))
    }

    fn astrometry(&self, _t: f64, _band: usize) -> Result<[f64; 2], ModelError> {
        unsupported(self.kind, "astrometry")
    }

    fn derived_params(&self) -> Vec<(&'static str, f64)> {
        if self.kind.parallax() {
            vec![("piE_amp", f64::hypot(self.pi_e[0], self.pi_e[1]))]
        } else {
            vec![]
        }
    }
}
