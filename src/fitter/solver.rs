use crate::data::EventData;
use crate::error::{FitError, ModelError};
use crate::fitter::{DataWeighting, ParamLayout, SolverOptions};
use crate::model::{MicrolensModel, MicrolensModelTrait, ModelKind, ModelParams};
use crate::prior::{PosteriorHistogramPrior, Prior1D, Prior1DTrait, default_prior};
use crate::results::{BestFitKind, FitResult};
use crate::sampler::{NestedRun, NestedSampler};
use crate::special::LN_SQRT_2PI;

use ndarray::{Array1, Array2, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info, warn};

/// Chi-squared of a parameter set, split by data set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Chi2Breakdown {
    /// Chi-squared of every photometric band
    pub phot: Vec<f64>,
    /// Chi-squared of every astrometric set, both axes together
    pub ast: Vec<f64>,
}

impl Chi2Breakdown {
    pub fn phot_total(&self) -> f64 {
        self.phot.iter().sum()
    }

    pub fn ast_total(&self) -> f64 {
        self.ast.iter().sum()
    }

    pub fn total(&self) -> f64 {
        self.phot_total() + self.ast_total()
    }

    fn log(&self) {
        for (i, chi2) in self.phot.iter().enumerate() {
            debug!(band = i + 1, chi2, "photometric chi2");
        }
        for (i, chi2) in self.ast.iter().enumerate() {
            debug!(set = i + 1, chi2, "astrometric chi2");
        }
        debug!(
            chi2_phot = self.phot_total(),
            chi2_ast = self.ast_total(),
            chi2 = self.total(),
            "chi2"
        );
    }
}

/// Log-likelihood of every data set
struct LnLikelihoodTerms {
    phot: Vec<f64>,
    ast: Vec<f64>,
}

/// Bayesian fit of a microlensing model to the data of one event
///
/// The solver owns the data, the parameter layout and one prior per sampled parameter.
/// Defaults for priors come from [default_prior] and may be replaced before [Solver::solve].
#[derive(Clone, Debug)]
pub struct Solver {
    data: EventData,
    options: SolverOptions,
    layout: ParamLayout,
    priors: Vec<Prior1D>,
    /// Joint prior and the indices of the parameters it covers
    posterior_prior: Option<(PosteriorHistogramPrior, Vec<usize>)>,
    phot_weights: Vec<f64>,
    ast_weight: f64,
}

impl Solver {
    pub fn new(
        data: EventData,
        kind: ModelKind,
        options: SolverOptions,
    ) -> Result<Self, FitError> {
        check_data(&data, kind)?;
        let layout = ParamLayout::new(kind, &data, &options)?;
        let priors = layout
            .fitter_param_names()
            .iter()
            .map(|name| default_prior(name, &data))
            .collect::<Result<Vec<_>, _>>()?;
        let (phot_weights, ast_weight) = data_weights(&options.weighting, &data, &layout)?;
        info!(
            target = data.target,
            model = kind.name(),
            n_dims = layout.n_dims(),
            n_phot_sets = layout.n_phot_sets(),
            n_ast_sets = layout.n_ast_sets(),
            "solver is set up"
        );
        Ok(Self {
            data,
            options,
            layout,
            priors,
            posterior_prior: None,
            phot_weights,
            ast_weight,
        })
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn kind(&self) -> ModelKind {
        self.layout.kind()
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    pub fn prior(&self, name: &str) -> Option<&Prior1D> {
        self.layout.index_of(name).map(|i| &self.priors[i])
    }

    /// Replace the prior of a sampled parameter
    pub fn set_prior(&mut self, name: &str, prior: Prior1D) -> Result<(), FitError> {
        let index = self
            .layout
            .index_of(name)
            .ok_or_else(|| ModelError::UnknownParameter(name.to_owned()))?;
        self.priors[index] = prior;
        Ok(())
    }

    /// Use the posterior of a previous fit as a joint prior of its parameters
    ///
    /// Parameters covered by the histogram ignore their one-dimensional priors.
    pub fn set_posterior_prior(
        &mut self,
        prior: PosteriorHistogramPrior,
    ) -> Result<(), FitError> {
        let indices = prior
            .names()
            .iter()
            .map(|name| {
                self.layout
                    .index_of(name)
                    .ok_or_else(|| ModelError::UnknownParameter(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.posterior_prior = Some((prior, indices));
        Ok(())
    }

    fn check_dims(&self, values: &[f64]) -> Result<(), FitError> {
        let n_dims = self.layout.n_dims();
        if values.len() == n_dims || values.len() == self.layout.n_params() {
            Ok(())
        } else {
            Err(FitError::WrongDimension {
                expected: n_dims,
                actual: values.len(),
            })
        }
    }

    fn transform_cube(&self, cube: &[f64]) -> Vec<f64> {
        let mut params: Vec<f64> = self
            .priors
            .iter()
            .zip(cube)
            .map(|(prior, &u)| prior.ppf(u))
            .collect();
        if let Some((prior, indices)) = &self.posterior_prior {
            let sub_cube: Vec<f64> = indices.iter().map(|&i| cube[i]).collect();
            for (&i, value) in indices.iter().zip(prior.transform(&sub_cube)) {
                params[i] = value;
            }
        }
        params
    }

    /// Map a point of the unit hypercube to the sampled parameter values
    pub fn prior_transform(&self, cube: &[f64]) -> Result<Vec<f64>, FitError> {
        if cube.len() != self.layout.n_dims() {
            return Err(FitError::WrongDimension {
                expected: self.layout.n_dims(),
                actual: cube.len(),
            });
        }
        Ok(self.transform_cube(cube))
    }

    /// Natural logarithm of the joint prior density of the sampled parameters
    pub fn ln_prior(&self, params: &[f64]) -> Result<f64, FitError> {
        self.check_dims(params)?;
        Ok(self
            .priors
            .iter()
            .zip(params)
            .map(|(prior, &x)| prior.ln_pdf(x))
            .sum())
    }

    /// Build the model from the sampled parameter values, extra values are ignored
    pub fn get_model(&self, params: &[f64]) -> Result<MicrolensModel, FitError> {
        self.check_dims(params)?;
        let n_dims = self.layout.n_dims();
        let model_params =
            ModelParams::from_named(self.layout.fitter_param_names(), &params[..n_dims]);
        Ok(self.kind().build(&model_params, self.data.coordinates)?)
    }

    /// Derived parameters ordered as [ParamLayout::additional_param_names]
    pub fn additional_params(&self, params: &[f64]) -> Result<Vec<f64>, FitError> {
        let derived = self.get_model(params)?.derived_params();
        self.layout
            .additional_param_names()
            .iter()
            .map(|name| {
                derived
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|&(_, value)| value)
                    .ok_or_else(|| FitError::from(ModelError::UnknownParameter(name.clone())))
            })
            .collect()
    }

    /// Photometric errors of a band modified by the fitted noise parameters
    ///
    /// `add_errN` is added in quadrature, then the result is multiplied by `mult_errN`.
    pub fn modified_mag_err(
        &self,
        params: &[f64],
        band: usize,
    ) -> Result<Array1<f64>, FitError> {
        self.check_dims(params)?;
        let mut mag_err = self.data.phot(band)?.mag_err.clone();
        if let Some(i) = self.layout.add_err_index(band) {
            let add_err = params[i];
            mag_err.mapv_inplace(|err| err.hypot(add_err));
        }
        if let Some(i) = self.layout.mult_err_index(band) {
            mag_err *= params[i];
        }
        Ok(mag_err)
    }

    fn ln_likelihood_terms(
        &self,
        model: &MicrolensModel,
        params: &[f64],
    ) -> Result<LnLikelihoodTerms, FitError> {
        let phot = (0..self.layout.n_phot_sets())
            .map(|band| {
                let phot = self.data.phot(band)?;
                let mag_err = self.modified_mag_err(params, band)?;
                Ok(model.log_likely_photometry(
                    phot.t.view(),
                    phot.mag.view(),
                    mag_err.view(),
                    band,
                )?)
            })
            .collect::<Result<Vec<_>, FitError>>()?;
        let ast = self
            .layout
            .ast_to_phot()
            .iter()
            .enumerate()
            .map(|(set, &band)| {
                let ast = self.data.ast(set)?;
                Ok(model.log_likely_astrometry(
                    ast.t.view(),
                    ast.x.view(),
                    ast.y.view(),
                    ast.x_err.view(),
                    ast.y_err.view(),
                    band,
                )?)
            })
            .collect::<Result<Vec<_>, FitError>>()?;
        Ok(LnLikelihoodTerms { phot, ast })
    }

    /// Log-likelihood of the data, sum of the weighted photometric and astrometric terms
    pub fn log_likely(&self, params: &[f64]) -> Result<f64, FitError> {
        let model = self.get_model(params)?;
        let terms = self.ln_likelihood_terms(&model, params)?;
        let ln_l_phot: f64 = terms
            .phot
            .iter()
            .zip(&self.phot_weights)
            .map(|(ln_l, w)| ln_l * w)
            .sum();
        let ln_l_ast = self.ast_weight * terms.ast.iter().sum::<f64>();
        Ok(ln_l_phot + ln_l_ast)
    }

    /// Chi-squared from the unweighted log-likelihood with the normalisation removed
    pub fn calc_chi2(&self, params: &[f64]) -> Result<Chi2Breakdown, FitError> {
        let model = self.get_model(params)?;
        let terms = self.ln_likelihood_terms(&model, params)?;
        let phot = terms
            .phot
            .iter()
            .enumerate()
            .map(|(band, &ln_l)| {
                let mag_err = self.modified_mag_err(params, band)?;
                Ok(-2.0 * (ln_l - ln_normalisation(&mag_err)))
            })
            .collect::<Result<Vec<_>, FitError>>()?;
        let ast = terms
            .ast
            .iter()
            .enumerate()
            .map(|(set, &ln_l)| {
                let ast = self.data.ast(set)?;
                let ln_norm = ln_normalisation(&ast.x_err) + ln_normalisation(&ast.y_err);
                Ok(-2.0 * (ln_l - ln_norm))
            })
            .collect::<Result<Vec<_>, FitError>>()?;
        let chi2 = Chi2Breakdown { phot, ast };
        chi2.log();
        Ok(chi2)
    }

    /// Chi-squared as a direct sum of squared normalised residuals, NaN residuals are skipped
    pub fn calc_chi2_manual(&self, params: &[f64]) -> Result<Chi2Breakdown, FitError> {
        let model = self.get_model(params)?;
        let nansum = |x: Array1<f64>| x.iter().filter(|x| !x.is_nan()).sum::<f64>();
        let phot = (0..self.layout.n_phot_sets())
            .map(|band| {
                let phot = self.data.phot(band)?;
                let mag_err = self.modified_mag_err(params, band)?;
                let mag_model = model.photometry_array(phot.t.view(), band)?;
                let chi2 = Zip::from(&phot.mag)
                    .and(&mag_model)
                    .and(&mag_err)
                    .map_collect(|&mag, &model, &err| ((mag - model) / err).powi(2));
                Ok(nansum(chi2))
            })
            .collect::<Result<Vec<_>, FitError>>()?;
        let ast = self
            .layout
            .ast_to_phot()
            .iter()
            .enumerate()
            .map(|(set, &band)| {
                let ast = self.data.ast(set)?;
                let pos = model.astrometry_array(ast.t.view(), band)?;
                let chi2 = Zip::from(pos.rows())
                    .and(&ast.x)
                    .and(&ast.y)
                    .and(&ast.x_err)
                    .and(&ast.y_err)
                    .map_collect(|pos, &x, &y, &x_err, &y_err| {
                        ((x - pos[0]) / x_err).powi(2) + ((y - pos[1]) / y_err).powi(2)
                    });
                Ok(nansum(chi2))
            })
            .collect::<Result<Vec<_>, FitError>>()?;
        let chi2 = Chi2Breakdown { phot, ast };
        chi2.log();
        Ok(chi2)
    }

    /// Number of measurements entering the likelihood, astrometric epochs count twice
    pub fn n_data_points(&self) -> usize {
        let n_phot: usize = self.data.photometry[..self.layout.n_phot_sets()]
            .iter()
            .map(|phot| phot.len())
            .sum();
        let n_ast: usize = self.data.astrometry[..self.layout.n_ast_sets()]
            .iter()
            .map(|ast| 2 * ast.len())
            .sum();
        n_phot + n_ast
    }

    fn output_path(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.options.outputfiles_basename)
    }

    /// Write names of the parameters, priors and options to `<basename>params.json`
    pub fn write_params_json(&self) -> Result<(), FitError> {
        #[derive(Serialize)]
        struct ParamsFile<'a> {
            model: &'static str,
            #[serde(flatten)]
            layout: &'a ParamLayout,
            all_param_names: Vec<String>,
            priors: Vec<(&'a str, &'a Prior1D)>,
            posterior_prior: Option<&'a PosteriorHistogramPrior>,
            options: &'a SolverOptions,
        }

        let file = ParamsFile {
            model: self.kind().name(),
            layout: &self.layout,
            all_param_names: self.layout.all_param_names(),
            priors: self
                .layout
                .fitter_param_names()
                .iter()
                .map(String::as_str)
                .zip(&self.priors)
                .collect(),
            posterior_prior: self.posterior_prior.as_ref().map(|(prior, _)| prior),
            options: &self.options,
        };
        let writer = BufWriter::new(File::create(self.output_path("params.json"))?);
        serde_json::to_writer_pretty(writer, &file)?;
        Ok(())
    }

    /// Write `<basename>maxL_summary.txt` for the maximum-likelihood sample of `result`
    pub fn write_summary_max_l(&self, result: &FitResult) -> Result<(), FitError> {
        let best = result.best_fit(BestFitKind::MaxL)?;
        let chi2 = self.calc_chi2(&best.values)?;
        result.write_summary_max_l(
            self.output_path("maxL_summary.txt"),
            chi2.total(),
            self.n_data_points(),
        )
    }

    fn fit_result(&self, run: NestedRun) -> FitResult {
        let n_dims = self.layout.n_dims();
        let n_extra = self.layout.additional_param_names().len();
        let extra: Vec<Vec<f64>> = (0..run.n_samples())
            .into_par_iter()
            .map(|i| {
                self.additional_params(&run.samples.row(i).to_vec())
                    .unwrap_or_else(|_| vec![f64::NAN; n_extra])
            })
            .collect();
        let mut samples = Array2::zeros((run.n_samples(), n_dims + n_extra));
        for (i, extra) in extra.into_iter().enumerate() {
            let values = run.samples.row(i).into_iter().chain(&extra);
            for (j, &value) in values.enumerate() {
                samples[(i, j)] = value;
            }
        }
        FitResult {
            param_names: self.layout.all_param_names(),
            n_dims,
            samples,
            weights: run.weights(),
            ln_likelihood: run.ln_likelihood,
            ln_evidence: run.ln_evidence,
            ln_evidence_err: run.ln_evidence_err,
            information: run.information,
        }
    }

    /// Sample the posterior
    ///
    /// When `write_output` is set, the parameter description, the weighted posterior table and
    /// the summary are written to `<basename>params.json`, `<basename>post.csv` and
    /// `<basename>summary.json`.
    pub fn solve(&self) -> Result<FitResult, FitError> {
        if self.options.write_output {
            if let Some(dir) = Path::new(&self.options.outputfiles_basename).parent() {
                if !dir.as_os_str().is_empty() {
                    std::fs::create_dir_all(dir)?;
                }
            }
            self.write_params_json()?;
        }
        if self.posterior_prior.is_some() {
            info!("using posterior of a previous fit as a prior");
        }

        let sampler = NestedSampler::new(self.options.sampler.clone());
        let run = sampler.run(
            self.layout.n_dims(),
            |cube| self.transform_cube(cube),
            |params| self.log_likely(params).unwrap_or(f64::NEG_INFINITY),
        )?;
        let result = self.fit_result(run);

        if self.options.write_output {
            result.write_csv(self.output_path("post.csv"))?;
            result
                .summary(self.kind().name())?
                .to_json_file(self.output_path("summary.json"))?;
        }
        Ok(result)
    }
}

/// `sum(-0.5 ln(2 pi err^2))`
fn ln_normalisation(err: &Array1<f64>) -> f64 {
    -err.iter().map(|err| err.ln() + LN_SQRT_2PI).sum::<f64>()
}

/// Fail if the model needs data the event doesn't have, warn about data the model ignores
fn check_data(data: &EventData, kind: ModelKind) -> Result<(), FitError> {
    let flags = kind.flags();
    let required = |kind_of_data| FitError::DataRequired {
        kind: kind_of_data,
        model: kind.name().to_owned(),
    };
    if flags.photometry && data.photometry.is_empty() {
        return Err(required("photometry"));
    }
    if flags.astrometry && data.astrometry.is_empty() {
        return Err(required("astrometry"));
    }
    if flags.parallax && data.coordinates.is_none() {
        return Err(ModelError::MissingCoordinates(kind.name()).into());
    }
    if !flags.photometry && !data.photometry.is_empty() {
        warn!(
            model = kind.name(),
            n_sets = data.n_phot_sets(),
            "model has no photometry, photometric data will be ignored"
        );
    }
    if !flags.astrometry && !data.astrometry.is_empty() {
        warn!(
            model = kind.name(),
            n_sets = data.n_ast_sets(),
            "model has no astrometry, astrometric data will be ignored"
        );
    }
    Ok(())
}

/// Likelihood weights of every photometric band and of the astrometry
fn data_weights(
    weighting: &DataWeighting,
    data: &EventData,
    layout: &ParamLayout,
) -> Result<(Vec<f64>, f64), FitError> {
    let n_phot_i: Vec<f64> = data.photometry[..layout.n_phot_sets()]
        .iter()
        .map(|phot| phot.len() as f64)
        .collect();
    let n_phot: f64 = n_phot_i.iter().sum();
    let n_ast = data.astrometry[..layout.n_ast_sets()]
        .iter()
        .map(|ast| 2.0 * ast.len() as f64)
        .sum::<f64>();
    let has_ast = layout.n_ast_sets() > 0;

    match weighting {
        DataWeighting::None => Ok((vec![1.0; n_phot_i.len()], 1.0)),
        DataWeighting::PhotAstromEqual => {
            if n_phot == 0.0 || !has_ast {
                return Err(FitError::Weights(
                    "equal photometry and astrometry weighting needs both kinds of data",
                ));
            }
            Ok((n_phot_i.iter().map(|n| n_ast / n).collect(), n_phot / n_ast))
        }
        DataWeighting::AllEqual => {
            let ast_weight = if has_ast { 1.0 / n_ast } else { 1.0 };
            Ok((n_phot_i.iter().map(|n| 1.0 / n).collect(), ast_weight))
        }
        DataWeighting::Custom(weights) => {
            let expected = n_phot_i.len() + usize::from(has_ast);
            if weights.len() != expected {
                return Err(FitError::Weights(
                    "custom weights need a value per photometric band and one for astrometry",
                ));
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(FitError::Weights("custom weights must be non-negative"));
            }
            let ast_weight = if has_ast { weights[expected - 1] } else { 1.0 };
            Ok((weights[..n_phot_i.len()].to_vec(), ast_weight))
        }
    }
}
