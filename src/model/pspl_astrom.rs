use crate::error::ModelError;
use crate::model::geometry::{
    AstrometricPspl, Blending, SourceMotion, Trajectory, require_positive, sky_position,
    unit_vector,
};
use crate::model::{MicrolensModelTrait, ModelKind, ModelParams, unsupported};
use crate::physics::constants::{DAYS_PER_YEAR, KAPPA, MAS_PC};
use crate::physics::pspl_amplification;

use macro_const::macro_const;

macro_const! {
    const DOC: &str = r#"
Point-source point-lens model with a dark lens for photometry and astrometry

The source moves linearly on the sky with proper motion $\mu_S$ and parallax $\pi_S$, the
light centroid is displaced from the unlensed source position by

$$
\delta\vec\theta = \theta_E \frac{\vec u}{u^2 + 2}.
$$

Two parameterisations are available:

- physical: `mL` (solar masses), `t0`, `beta` (mas), `dL` (pc), `dL_dS`, `xS0_E`, `xS0_N`
  (arcsec), `muL_E`, `muL_N`, `muS_E`, `muS_N` (mas/yr). Derived are `tE`, `thetaE`, `piE_E`,
  `piE_N`, `u0_amp`, `muRel_E`, `muRel_N`, `dS`, `piS`, `piL`, `piRel`;
- observable: `t0`, `u0_amp`, `tE`, `thetaE` (mas), `piS` (mas), `piE_E`, `piE_N`, `xS0_E`,
  `xS0_N`, `muS_E`, `muS_N`. Derived are `mL`, `dL`, `dS`, `piL`, `piRel`, `muL_E`, `muL_N`,
  `muRel_E`, `muRel_N`. The observable parameterisation is also available for astrometry
  alone.

The Einstein radius is $\theta_E^2 = \kappa M_L \pi_\mathrm{rel}$,
$\kappa = 8.1459$ mas/$M_\odot$, relative proper motion is $\mu_\mathrm{rel} = \mu_S - \mu_L$
and the microlensing parallax vector $\pi_E = \pi_\mathrm{rel}/\theta_E$ is parallel to it.
Photometric bands take `b_sff` and `mag_src`.
"#;
}

#[doc = DOC!()]
#[derive(Clone, Debug, PartialEq)]
pub struct PsplPhotAstrom {
    kind: ModelKind,
    pspl: AstrometricPspl,
    blending: Option<Blending>,
    derived: Vec<(&'static str, f64)>,
}

impl PsplPhotAstrom {
    pub(super) fn from_params(
        kind: ModelKind,
        params: &ModelParams,
        coordinates: Option<(f64, f64)>,
    ) -> Result<Self, ModelError> {
        let sky = sky_position(kind.parallax(), coordinates, kind.name())?;
        let xs0 = [params.get("xS0_E")?, params.get("xS0_N")?];
        let mu_s = [params.get("muS_E")?, params.get("muS_N")?];

        let (pspl, derived) = match kind {
            ModelKind::PsplPhotAstromPhys { .. } => {
                let m_l = require_positive("mL", params.get("mL")?)?;
                let d_l = require_positive("dL", params.get("dL")?)?;
                let dl_ds = params.get("dL_dS")?;
                if !(dl_ds > 0.0 && dl_ds < 1.0) {
                    return Err(ModelError::Unphysical {
                        name: "dL_dS",
                        value: dl_ds,
                        reason: "lens must be between the observer and the source",
                    });
                }
                let d_s = d_l / dl_ds;
                let pi_l = MAS_PC / d_l;
                let pi_s = MAS_PC / d_s;
                let pi_rel = pi_l - pi_s;
                let theta_e = f64::sqrt(KAPPA * m_l * pi_rel);

                let mu_l = [params.get("muL_E")?, params.get("muL_N")?];
                let mu_rel = [mu_s[0] - mu_l[0], mu_s[1] - mu_l[1]];
                let mu_rel_amp = require_positive("muRel", f64::hypot(mu_rel[0], mu_rel[1]))?;
                let t_e = theta_e / mu_rel_amp * DAYS_PER_YEAR;
                let e_hat = unit_vector(mu_rel[0], mu_rel[1]);
                let pi_e_amp = pi_rel / theta_e;
                let u0_amp = params.get("beta")? / theta_e;

                let trajectory =
                    Trajectory::new(params.get("t0")?, u0_amp, t_e, e_hat, pi_e_amp, sky)?;
                let derived = vec![
                    ("tE", t_e),
                    ("thetaE", theta_e),
                    ("piE_E", pi_e_amp * e_hat[0]),
                    ("piE_N", pi_e_amp * e_hat[1]),
                    ("u0_amp", u0_amp),
                    ("muRel_E", mu_rel[0]),
                    ("muRel_N", mu_rel[1]),
                    ("dS", d_s),
                    ("piS", pi_s),
                    ("piL", pi_l),
                    ("piRel", pi_rel),
                ];
                let source = SourceMotion { xs0, mu_s, pi_s };
                (
                    AstrometricPspl {
                        trajectory,
                        source,
                        theta_e,
                    },
                    derived,
                )
            }
            ModelKind::PsplPhotAstromObs { .. } | ModelKind::PsplAstromObs { .. } => {
                let t_e = require_positive("tE", params.get("tE")?)?;
                let theta_e = require_positive("thetaE", params.get("thetaE")?)?;
                let pi_s = require_positive("piS", params.get("piS")?)?;
                let pi_e = [params.get("piE_E")?, params.get("piE_N")?];
                let pi_e_amp = require_positive("piE_amp", f64::hypot(pi_e[0], pi_e[1]))?;
                let e_hat = unit_vector(pi_e[0], pi_e[1]);

                let pi_rel = pi_e_amp * theta_e;
                let pi_l = pi_rel + pi_s;
                let m_l = theta_e * theta_e / (KAPPA * pi_rel);
                let mu_rel_amp = theta_e / t_e * DAYS_PER_YEAR;
                let mu_rel = [mu_rel_amp * e_hat[0], mu_rel_amp * e_hat[1]];
                let mu_l = [mu_s[0] - mu_rel[0], mu_s[1] - mu_rel[1]];

                let trajectory = Trajectory::new(
                    params.get("t0")?,
                    params.get("u0_amp")?,
                    t_e,
                    e_hat,
                    pi_e_amp,
                    sky,
                )?;
                let derived = vec![
                    ("mL", m_l),
                    ("dL", MAS_PC / pi_l),
                    ("dS", MAS_PC / pi_s),
                    ("piL", pi_l),
                    ("piRel", pi_rel),
                    ("muL_E", mu_l[0]),
                    ("muL_N", mu_l[1]),
                    ("muRel_E", mu_rel[0]),
                    ("muRel_N", mu_rel[1]),
                ];
                let source = SourceMotion { xs0, mu_s, pi_s };
                (
                    AstrometricPspl {
                        trajectory,
                        source,
                        theta_e,
                    },
                    derived,
                )
            }
            _ => return unsupported(kind, "astrometry"),
        };

        let blending = if kind.flags().photometry {
            Some(Blending::from_params(params, false)?)
        } else {
            None
        };

        Ok(Self {
            kind,
            pspl,
            blending,
            derived,
        })
    }

    /// Angular Einstein radius in mas
    pub fn theta_e(&self) -> f64 {
        self.pspl.theta_e
    }

    pub fn doc() -> &'static str {
        DOC
    }
}

impl MicrolensModelTrait for PsplPhotAstrom {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn amplification(&self, t: f64) -> f64 {
        pspl_amplification(self.pspl.trajectory.u(t))
    }

    fn n_bands(&self) -> usize {
        self.blending.as_ref().map_or(0, Blending::n_bands)
    }

    fn photometry(&self, t: f64, band: usize) -> Result<f64, ModelError> {
        let blending = match &self.blending {
            Some(blending) => blending,
            None => return unsupported(self.kind, "photometry"),
        };
        blending.check_band(band)?;
        Ok(blending.mag(self.amplification(t), band))
    }

    fn astrometry(&self, t: f64, band: usize) -> Result<[f64; 2], ModelError> {
        if let Some(blending) = &self.blending {
            blending.check_band(band)?;
        }
        Ok(self.pspl.centroid(t))
    }

    fn derived_params(&self) -> Vec<(&'static str, f64)> {
        self.derived.clone()
    }
}
