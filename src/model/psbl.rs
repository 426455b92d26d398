use crate::error::ModelError;
use crate::model::geometry::{Blending, Trajectory, sky_position};
use crate::model::{MicrolensModelTrait, ModelKind, ModelParams, unsupported};
use crate::physics::BinaryLens;

use macro_const::macro_const;
use num_complex::Complex64;

macro_const! {
    const DOC: &str = r#"
Point-source binary-lens photometric model

The lens consists of two point masses with mass ratio `q` $= m_2/m_1$ separated by `sep`
Einstein radii of the total mass. The source trajectory is defined relative to the centre of
mass of the lens by `t0`, `u0_amp` and `tE`, the binary axis, directed from the primary to the
secondary, is rotated by `alpha` degrees counter-clockwise (from East to North) relative to the
East direction. Magnification is the sum over the three or five images of a point source.

- Fit parameters: `t0`, `u0_amp`, `tE`, `piE_E`, `piE_N` with parallax, `q`, `sep`, `alpha`
- Per-band parameters: `b_sff`, `mag_src`
"#;
}

#[doc = DOC!()]
#[derive(Clone, Debug, PartialEq)]
pub struct PsblPhot {
    kind: ModelKind,
    trajectory: Trajectory,
    blending: Blending,
    lens: BinaryLens,
    /// sin and cos of the binary axis angle
    axis: (f64, f64),
    pi_e: [f64; 2],
}

impl PsblPhot {
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
            lens: BinaryLens::new(params.get("sep")?, params.get("q")?)?,
            axis: params.get("alpha")?.to_radians().sin_cos(),
            pi_e,
        })
    }

    /// Source position in the lens frame, the primary is on the negative real axis
    pub fn source_position(&self, t: f64) -> Complex64 {
        let [u_e, u_n] = self.trajectory.u_vec(t);
        let (sin_a, cos_a) = self.axis;
        Complex64::new(u_e * cos_a + u_n * sin_a, -u_e * sin_a + u_n * cos_a)
    }

    pub fn doc() -> &'static str {
        DOC
    }
}

impl MicrolensModelTrait for PsblPhot {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn amplification(&self, t: f64) -> f64 {
        self.lens.magnification(self.source_position(t))
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
