use crate::data::EventData;
use crate::error::PriorError;
use crate::model::params::{ERROR_PARAMS, MULTI_BAND_PARAMS};
use crate::model::split_param_filter_index;
use crate::prior::Prior1D;
use crate::prior::prior_1d::UniformPrior1D;
use crate::prior::data_driven::{
    mag_base_prior, mag_src_prior, mus_prior, pi_s_prior, t0_prior, xs0_prior,
};

use lazy_static::lazy_static;
use std::collections::BTreeMap;

/// Width of the source proper motion prior in standard errors of the straight-line fit
pub const MUS_SCALE_FACTOR: f64 = 100.0;

/// How the default prior of a parameter is built
#[derive(Clone, Debug, PartialEq)]
pub enum DefaultPrior {
    /// Fixed distribution independent of the data
    Fixed(Prior1D),
    /// Padded time range of the brightest part of the first light curve
    T0,
    /// Range of the source positions of the first astrometry set
    SourcePosition,
    /// Straight-line fit of the first astrometry set
    SourceProperMotion,
    /// Sigma-clipped mean magnitude of the band
    MagSrc,
    /// Sigma-clipped mean and scatter of magnitudes of the band
    MagBase,
    /// Galactic bulge source parallax
    SourceParallax,
}

lazy_static! {
    static ref DEFAULT_PRIORS: BTreeMap<&'static str, DefaultPrior> = {
        use DefaultPrior::*;
        [
            ("mL", Fixed(Prior1D::uniform(0.0, 100.0))),
            ("t0", T0),
            ("xS0_E", SourcePosition),
            ("xS0_N", SourcePosition),
            ("u0_amp", Fixed(Prior1D::uniform(-1.0, 1.0))),
            ("beta", Fixed(Prior1D::uniform(-2.0, 2.0))),
            ("muL_E", Fixed(Prior1D::uniform(-20.0, 20.0))),
            ("muL_N", Fixed(Prior1D::uniform(-20.0, 20.0))),
            ("muS_E", SourceProperMotion),
            ("muS_N", SourceProperMotion),
            ("dL", Fixed(Prior1D::uniform(1000.0, 8000.0))),
            ("dS", Fixed(Prior1D::uniform(100.0, 10000.0))),
            ("dL_dS", Fixed(Prior1D::uniform(0.01, 0.99))),
            ("b_sff", Fixed(Prior1D::uniform(0.0, 1.5))),
            ("mag_src", MagSrc),
            ("mag_base", MagBase),
            ("tE", Fixed(Prior1D::uniform(1.0, 400.0))),
            ("piE_E", Fixed(Prior1D::uniform(-1.0, 1.0))),
            ("piE_N", Fixed(Prior1D::uniform(-1.0, 1.0))),
            ("thetaE", Fixed(Prior1D::log_normal(0.0, 1.0))),
            ("log10_thetaE", Fixed(Prior1D::trunc_normal(-0.2, 0.3, -4.0, 4.0))),
            ("q", Fixed(Prior1D::uniform(0.001, 1.0))),
            ("alpha", Fixed(Prior1D::uniform(0.0, 360.0))),
            ("phi", Fixed(Prior1D::uniform(0.0, 360.0))),
            // Einstein radii, 95% of the mass within [0.1, 10]
            ("sep", Fixed(Prior1D::log10_normal(0.0, 0.5))),
            ("piS", SourceParallax),
            ("add_err", Fixed(Prior1D::uniform(0.0, 0.3))),
            ("mult_err", Fixed(Prior1D::uniform(1.0, 3.0))),
            ("radius", Fixed(Prior1D::uniform(1e-4, 1e-2))),
        ]
        .into_iter()
        .collect()
    };
}

impl DefaultPrior {
    /// Look up the default for a fit parameter name, per-band names are looked up by their base
    pub fn lookup(name: &str) -> Result<&'static Self, PriorError> {
        DEFAULT_PRIORS
            .get(table_key(name))
            .ok_or_else(|| PriorError::NoDefault(name.to_owned()))
    }

    /// Build the distribution for parameter `name` from the event data
    pub fn build(&self, name: &str, data: &EventData) -> Result<Prior1D, PriorError> {
        let missing = |what| PriorError::MissingData {
            name: name.to_owned(),
            what,
        };
        match self {
            Self::Fixed(prior) => Ok(prior.clone()),
            Self::T0 => match data.photometry.first() {
                Some(phot) => t0_prior(phot.t.view(), phot.mag.view()),
                None => {
                    // Astrometry-only event, no light curve peak to look at
                    let ast = data.astrometry.first().ok_or_else(|| missing("observations"))?;
                    let t = &ast.t;
                    UniformPrior1D::try_new(t[0], t[t.len() - 1]).map(Into::into)
                }
            },
            Self::SourcePosition => {
                let ast = data.astrometry.first().ok_or_else(|| missing("astrometry"))?;
                xs0_prior(axis(name, &ast.x, &ast.y).view())
            }
            Self::SourceProperMotion => {
                let ast = data.astrometry.first().ok_or_else(|| missing("astrometry"))?;
                mus_prior(ast.t.view(), axis(name, &ast.x, &ast.y).view(), MUS_SCALE_FACTOR)
            }
            Self::MagSrc | Self::MagBase => {
                let band = match split_param_filter_index(name) {
                    (_, Some(index)) => index - 1,
                    (_, None) => 0,
                };
                let phot = data.phot(band).map_err(|_| missing("photometry"))?;
                if matches!(self, Self::MagSrc) {
                    mag_src_prior(phot.mag.view())
                } else {
                    mag_base_prior(phot.mag.view())
                }
            }
            Self::SourceParallax => Ok(pi_s_prior()),
        }
    }
}

/// Default prior of a fit parameter
pub fn default_prior(name: &str, data: &EventData) -> Result<Prior1D, PriorError> {
    DefaultPrior::lookup(name)?.build(name, data)
}

fn table_key(name: &str) -> &str {
    match split_param_filter_index(name) {
        (base, Some(_)) if MULTI_BAND_PARAMS.contains(&base) || ERROR_PARAMS.contains(&base) => {
            base
        }
        _ => name,
    }
}

fn axis<'a, T>(name: &str, east: &'a T, north: &'a T) -> &'a T {
    if name.ends_with("_N") { north } else { east }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::data::{Astrometry, Photometry};
    use crate::prior::Prior1DTrait;
    use approx::assert_relative_eq;
    use ndarray::Array1;

    fn event() -> EventData {
        let t = Array1::linspace(57_000.0, 57_200.0, 41);
        let mag = t.mapv(|t: f64| 19.0 - 2.0 * f64::exp(-((t - 57_100.0) / 10.0).powi(2)));
        // 1 mas/yr with a small wobble
        let x = t.mapv(|t: f64| 1e-3 * (t - 57_100.0) / 365.25 + 1e-6 * t.sin());
        let err = Array1::from_elem(41, 0.01);
        EventData::new("test")
            .with_photometry(Photometry::new("I", t.clone(), mag, err.clone()).unwrap())
            .with_photometry(Photometry::new("Kp", t.clone(), x.mapv(|x| 15.0 + x), err).unwrap())
            .with_astrometry(
                Astrometry::new(
                    "Kp",
                    t.clone(),
                    x.clone(),
                    -&x,
                    Array1::from_elem(41, 1e-4),
                    Array1::from_elem(41, 1e-4),
                )
                .unwrap(),
            )
    }

    #[test]
    fn fixed_defaults() {
        let data = event();
        assert_eq!(
            default_prior("tE", &data).unwrap(),
            Prior1D::uniform(1.0, 400.0)
        );
        assert_eq!(
            default_prior("b_sff2", &data).unwrap(),
            Prior1D::uniform(0.0, 1.5)
        );
        assert_eq!(
            default_prior("mult_err1", &data).unwrap(),
            Prior1D::uniform(1.0, 3.0)
        );
    }

    #[test]
    fn binary_separation_in_einstein_radii() {
        let sep = default_prior("sep", &event()).unwrap();
        assert_relative_eq!(sep.ppf(0.5), 1.0, max_relative = 1e-12);
        let (lo, hi) = (sep.ppf(0.025), sep.ppf(0.975));
        assert!(lo > 0.1 && lo < 0.11, "{lo}");
        assert!(hi > 9.0 && hi < 10.0, "{hi}");
        // Resonant caustics around sep = 1 are well inside the prior
        assert!(sep.ln_pdf(1.0) > sep.ln_pdf(0.01) + 3.0);
    }

    #[test]
    fn unknown_name() {
        assert_eq!(
            DefaultPrior::lookup("gp_log_rho1"),
            Err(PriorError::NoDefault("gp_log_rho1".into()))
        );
    }

    #[test]
    fn band_priors_use_their_band() {
        let data = event();
        let (lo1, _) = default_prior("mag_src1", &data).unwrap().support();
        let (lo2, _) = default_prior("mag_src2", &data).unwrap().support();
        assert!(lo1 > 17.0);
        assert!(lo2 < 14.5);
        assert!(matches!(
            default_prior("mag_base3", &data),
            Err(PriorError::MissingData { .. })
        ));
    }

    #[test]
    fn data_driven_defaults() {
        let data = event();
        let (lo, hi) = default_prior("t0", &data).unwrap().support();
        assert!(lo < 57_100.0 && hi > 57_100.0);

        let (lo, hi) = default_prior("muS_E", &data).unwrap().support();
        assert!(lo < 1.0 && hi > 1.0);
        let (lo, hi) = default_prior("muS_N", &data).unwrap().support();
        assert!(lo < -1.0 && hi > -1.0);

        let pi_s = default_prior("piS", &data).unwrap();
        assert_relative_eq!(pi_s.support().0, 0.05, max_relative = 1e-12);
    }

    #[test]
    fn astrometry_is_required_for_source_motion() {
        let t = Array1::linspace(0.0, 1.0, 5);
        let data = EventData::new("phot").with_photometry(
            Photometry::new("I", t.clone(), t.clone(), Array1::from_elem(5, 0.1)).unwrap(),
        );
        assert!(matches!(
            default_prior("xS0_E", &data),
            Err(PriorError::MissingData { .. })
        ));
    }
}
