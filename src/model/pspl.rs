use crate::error::ModelError;
use crate::model::geometry::{Blending, Trajectory, sky_position};
use crate::model::{MicrolensModelTrait, ModelKind, ModelParams, unsupported};
use crate::physics::pspl_amplification;

use macro_const::macro_const;

macro_const! {
    const DOC: &str = r#"
Point-source point-lens photometric model

Magnification of a point source by a point lens

$$
A(u) = \frac{u^2 + 2}{u \sqrt{u^2 + 4}},
$$

where $u(t)$ is the lens-source separation in Einstein radii. The magnitude in band $i$ is

$$
m_i(t) = m_{\mathrm{base},i} - 2.5 \lg\left(b_{\mathrm{sff},i} A(t) + 1 - b_{\mathrm{sff},i}\right),
$$

$b_\mathrm{sff}$ is the fraction of the baseline flux coming from the source. Bands are
parameterised either by source magnitudes `mag_src` or by baseline magnitudes `mag_base`.

- Fit parameters: `t0`, `u0_amp`, `tE`, and `piE_E`, `piE_N` with parallax
- Per-band parameters: `b_sff`, `mag_src` or `mag_base`
"#;
}

#[doc = DOC!()]
#[derive(Clone, Debug, PartialEq)]
pub struct PsplPhot {
    kind: ModelKind,
    trajectory: Trajectory,
    blending: Blending,
    pi_e: [f64; 2],
}

impl PsplPhot {
    pub(super) fn from_params(
        kind: ModelKind,
        params: &ModelParams,
        coordinates: Option<(f64, f64)>,
    ) -> Result<Self, ModelError> {
        let sky = sky_position(kind.parallax(), coordinates, kind.name())?;
        let (trajectory, pi_e) = Trajectory::from_photometric_params(params, sky)?;
        let blending =
            Blending::from_params(params, matches!(kind, ModelKind::PsplPhotBase { .. }))?;
        Ok(Self {
            kind,
            trajectory,
            blending,
            pi_e,
        })
    }

    /// Source magnitude of a band
    pub fn mag_src(&self, band: usize) -> f64 {
        self.blending.mag_src(band)
    }

    /// Baseline magnitude of a band
    pub fn mag_base(&self, band: usize) -> f64 {
        self.blending.mag_base[band]
    }

    pub fn doc() -> &'static str {
        DOC
    }
}

impl MicrolensModelTrait for PsplPhot {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn amplification(&self, t: f64) -> f64 {
        pspl_amplification(self.trajectory.u(t))
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
