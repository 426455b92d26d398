use crate::data::EventData;
use crate::error::{FitError, ModelError};
use crate::fitter::SolverOptions;
use crate::model::ModelKind;
use crate::number_ending;

use serde::Serialize;
use tracing::{debug, warn};

/// Names and positions of the parameters of a fit
///
/// The fitted vector starts with the band-independent model parameters, followed by the
/// parameters of every photometric band: model per-band parameters, optional per-band
/// parameters, `add_errN` and `mult_errN`, where `N` is the 1-based band index. Derived
/// ("additional") parameters follow the fitted ones in the posterior table but are never
/// sampled.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ParamLayout {
    #[serde(skip)]
    kind: ModelKind,
    fitter_param_names: Vec<String>,
    additional_param_names: Vec<String>,
    n_phot_sets: usize,
    n_ast_sets: usize,
    /// Photometric band of every astrometric set
    ast_to_phot: Vec<usize>,
    #[serde(skip)]
    add_err_index: Vec<Option<usize>>,
    #[serde(skip)]
    mult_err_index: Vec<Option<usize>>,
}

impl ParamLayout {
    pub fn new(
        kind: ModelKind,
        data: &EventData,
        options: &SolverOptions,
    ) -> Result<Self, FitError> {
        let flags = kind.flags();
        let n_phot_sets = if flags.photometry {
            data.n_phot_sets()
        } else {
            0
        };
        let n_ast_sets = if flags.astrometry {
            data.n_ast_sets()
        } else {
            0
        };
        let ast_to_phot = if n_ast_sets == 0 {
            vec![]
        } else if n_phot_sets == 0 {
            (0..n_ast_sets).collect()
        } else {
            data.ast_to_phot_map()?
        };

        let add_error = options.add_error_on_photometry.resolve(n_phot_sets)?;
        let mult_error = options.multiply_error_on_photometry.resolve(n_phot_sets)?;
        let use_optional = options.use_phot_optional_params.resolve(n_phot_sets)?;
        let optional = kind.phot_optional_param_names();
        if !optional.is_empty() && n_phot_sets > 0 && !use_optional.contains(&true) {
            warn!(
                model = kind.name(),
                "optional photometric parameters {optional:?} are switched off for all bands"
            );
        }

        let mut fitter_param_names: Vec<String> = kind
            .fitter_param_names()
            .into_iter()
            .map(String::from)
            .collect();
        let mut add_err_index = vec![None; n_phot_sets];
        let mut mult_err_index = vec![None; n_phot_sets];
        for band in 0..n_phot_sets {
            let suffix = band + 1;
            let first = fitter_param_names.len();
            fitter_param_names.extend(
                kind.phot_param_names()
                    .iter()
                    .map(|name| format!("{name}{suffix}")),
            );
            if use_optional[band] {
                fitter_param_names.extend(optional.iter().map(|name| format!("{name}{suffix}")));
            }
            if add_error[band] {
                add_err_index[band] = Some(fitter_param_names.len());
                fitter_param_names.push(format!("add_err{suffix}"));
            }
            if mult_error[band] {
                mult_err_index[band] = Some(fitter_param_names.len());
                fitter_param_names.push(format!("mult_err{suffix}"));
            }
            debug!(
                "{suffix}{} photometry set {:?}: parameters {:?}",
                number_ending(suffix),
                data.photometry[band].name,
                &fitter_param_names[first..],
            );
        }

        let model_additional = kind.additional_param_names();
        let additional_param_names = match &options.custom_additional_param_names {
            Some(custom) => {
                if let Some(unknown) = custom
                    .iter()
                    .find(|name| !model_additional.contains(&name.as_str()))
                {
                    return Err(ModelError::UnknownParameter(unknown.clone()).into());
                }
                custom.clone()
            }
            None => model_additional.into_iter().map(String::from).collect(),
        };

        Ok(Self {
            kind,
            fitter_param_names,
            additional_param_names,
            n_phot_sets,
            n_ast_sets,
            ast_to_phot,
            add_err_index,
            mult_err_index,
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Names of the sampled parameters
    pub fn fitter_param_names(&self) -> &[String] {
        &self.fitter_param_names
    }

    pub fn additional_param_names(&self) -> &[String] {
        &self.additional_param_names
    }

    /// Sampled parameters followed by derived parameters
    pub fn all_param_names(&self) -> Vec<String> {
        self.fitter_param_names
            .iter()
            .chain(&self.additional_param_names)
            .cloned()
            .collect()
    }

    /// Number of sampled parameters
    #[inline]
    pub fn n_dims(&self) -> usize {
        self.fitter_param_names.len()
    }

    /// Number of sampled and derived parameters
    #[inline]
    pub fn n_params(&self) -> usize {
        self.n_dims() + self.additional_param_names.len()
    }

    /// Number of photometric bands entering the likelihood
    #[inline]
    pub fn n_phot_sets(&self) -> usize {
        self.n_phot_sets
    }

    /// Number of astrometric sets entering the likelihood
    #[inline]
    pub fn n_ast_sets(&self) -> usize {
        self.n_ast_sets
    }

    pub fn ast_to_phot(&self) -> &[usize] {
        &self.ast_to_phot
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fitter_param_names.iter().position(|n| n == name)
    }

    pub(crate) fn add_err_index(&self, band: usize) -> Option<usize> {
        self.add_err_index.get(band).copied().flatten()
    }

    pub(crate) fn mult_err_index(&self, band: usize) -> Option<usize> {
        self.mult_err_index.get(band).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::data::{Astrometry, Photometry};
    use crate::fitter::BandSwitch;

    fn phot(name: &str) -> Photometry {
        Photometry::new(name, vec![0.0, 1.0], vec![19.0, 18.0], vec![0.01, 0.01]).unwrap()
    }

    fn ast(name: &str) -> Astrometry {
        Astrometry::new(
            name,
            vec![0.0, 1.0],
            vec![0.0; 2],
            vec![0.0; 2],
            vec![1e-4; 2],
            vec![1e-4; 2],
        )
        .unwrap()
    }

    #[test]
    fn band_parameters_follow_model_parameters() {
        let data = EventData::new("ob120169")
            .with_photometry(phot("I"))
            .with_photometry(phot("Kp"));
        let options = SolverOptions {
            add_error_on_photometry: BandSwitch::PerBand(vec![true, false]),
            multiply_error_on_photometry: BandSwitch::All(true),
            ..Default::default()
        };
        let layout =
            ParamLayout::new(ModelKind::PsplPhot { parallax: false }, &data, &options).unwrap();
        assert_eq!(
            layout.fitter_param_names(),
            &[
                "t0", "u0_amp", "tE", "b_sff1", "mag_src1", "add_err1", "mult_err1", "b_sff2",
                "mag_src2", "mult_err2"
            ]
        );
        assert_eq!(layout.n_dims(), 10);
        assert_eq!(layout.n_params(), 10);
        assert_eq!(layout.add_err_index(0), Some(5));
        assert_eq!(layout.add_err_index(1), None);
        assert_eq!(layout.mult_err_index(1), Some(9));
        assert_eq!(layout.index_of("mag_src2"), Some(8));
    }

    #[test]
    fn astrometric_model_with_derived_parameters() {
        let data = EventData::new("ob110022")
            .with_photometry(phot("I"))
            .with_photometry(phot("Kp"))
            .with_astrometry(ast("Kp"));
        let kind = ModelKind::PsplPhotAstromObs { parallax: true };
        let layout = ParamLayout::new(kind, &data, &SolverOptions::default()).unwrap();
        assert_eq!(layout.n_phot_sets(), 2);
        assert_eq!(layout.n_ast_sets(), 1);
        assert_eq!(layout.ast_to_phot(), &[1]);
        assert_eq!(layout.n_dims(), 11 + 4);
        assert_eq!(layout.n_params(), 11 + 4 + 9);
        assert_eq!(layout.all_param_names().last().unwrap(), "muRel_N");
    }

    #[test]
    fn ignored_data_sets() {
        let data = EventData::new("ob110022")
            .with_photometry(phot("I"))
            .with_astrometry(ast("Kp"));
        let layout = ParamLayout::new(
            ModelKind::PsplAstromObs { parallax: false },
            &data,
            &SolverOptions::default(),
        )
        .unwrap();
        assert_eq!(layout.n_phot_sets(), 0);
        assert_eq!(layout.ast_to_phot(), &[0]);
        assert!(!layout.fitter_param_names().iter().any(|n| n == "b_sff1"));

        let layout = ParamLayout::new(
            ModelKind::PsplPhot { parallax: false },
            &data,
            &SolverOptions::default(),
        )
        .unwrap();
        assert_eq!(layout.n_ast_sets(), 0);
        assert!(layout.ast_to_phot().is_empty());
    }

    #[test]
    fn custom_additional_parameters() {
        let data = EventData::new("ob110022")
            .with_photometry(phot("Kp"))
            .with_astrometry(ast("Kp"));
        let kind = ModelKind::PsplPhotAstromObs { parallax: false };
        let options = SolverOptions {
            custom_additional_param_names: Some(vec!["mL".into(), "dL".into()]),
            ..Default::default()
        };
        let layout = ParamLayout::new(kind, &data, &options).unwrap();
        assert_eq!(layout.additional_param_names(), &["mL", "dL"]);

        let options = SolverOptions {
            custom_additional_param_names: Some(vec!["mass".into()]),
            ..Default::default()
        };
        assert!(matches!(
            ParamLayout::new(kind, &data, &options),
            Err(FitError::Model(ModelError::UnknownParameter(name))) if name == "mass"
        ));
    }

    #[test]
    fn switch_length_must_match_bands() {
        let data = EventData::new("ob120169").with_photometry(phot("I"));
        let options = SolverOptions {
            multiply_error_on_photometry: BandSwitch::PerBand(vec![true, true]),
            ..Default::default()
        };
        assert!(matches!(
            ParamLayout::new(ModelKind::PsplPhot { parallax: false }, &data, &options),
            Err(FitError::WrongSwitchLength {
                expected: 1,
                actual: 2
            })
        ));
    }
}
