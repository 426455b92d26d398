use crate::error::FitError;
use crate::results::{
    BestFit, BestFitKind, FitResult, ParamQuantiles, Sigma, calc_aic, calc_bic,
};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

const WEIGHTS_COLUMN: &str = "weights";
const LN_LIKELIHOOD_COLUMN: &str = "logLike";

/// Evidence and best-fit values of a fit, stored next to the posterior table
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FitSummary {
    pub model: String,
    pub param_names: Vec<String>,
    pub n_dims: usize,
    pub n_samples: usize,
    pub effective_sample_size: f64,
    pub ln_evidence: f64,
    pub ln_evidence_err: f64,
    pub information: f64,
    pub max_ln_likelihood: f64,
    pub max_l: BestFit,
    pub median: Vec<ParamQuantiles>,
}

impl FitSummary {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FitError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<(), FitError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl FitResult {
    /// Kish's effective sample size of the weights
    pub fn effective_sample_size(&self) -> f64 {
        let sum = self.weights.sum();
        sum * sum / self.weights.mapv(|w| w * w).sum()
    }

    pub fn summary(&self, model: impl Into<String>) -> Result<FitSummary, FitError> {
        Ok(FitSummary {
            model: model.into(),
            param_names: self.param_names.clone(),
            n_dims: self.n_dims,
            n_samples: self.n_samples(),
            effective_sample_size: self.effective_sample_size(),
            ln_evidence: self.ln_evidence,
            ln_evidence_err: self.ln_evidence_err,
            information: self.information,
            max_ln_likelihood: self.max_ln_likelihood(),
            max_l: self.best_fit(BestFitKind::MaxL)?,
            median: self.quantiles(Sigma::One)?,
        })
    }

    /// Write the posterior table: weight, log-likelihood and parameter values of every sample
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), FitError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(
            [WEIGHTS_COLUMN, LN_LIKELIHOOD_COLUMN]
                .into_iter()
                .chain(self.param_names.iter().map(String::as_str)),
        )?;
        for ((row, &w), &ln_l) in self
            .samples
            .outer_iter()
            .zip(&self.weights)
            .zip(&self.ln_likelihood)
        {
            let record: Vec<f64> = [w, ln_l].into_iter().chain(row.iter().copied()).collect();
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a posterior table written by [FitResult::write_csv]
    ///
    /// The table doesn't store the evidence, corresponding fields are NaN. `n_dims` is the
    /// number of sampled parameters, they come first.
    pub fn read_csv(path: impl AsRef<Path>, n_dims: usize) -> Result<Self, FitError> {
        let mut reader = csv::ReaderBuilder::new().from_path(path)?;
        let headers = reader.headers()?.clone();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| FitError::MissingColumn(name.to_owned()))
        };
        let i_weights = position(WEIGHTS_COLUMN)?;
        let i_ln_l = position(LN_LIKELIHOOD_COLUMN)?;
        let param_columns: Vec<usize> = (0..headers.len())
            .filter(|&i| i != i_weights && i != i_ln_l)
            .collect();
        let param_names: Vec<String> = param_columns
            .iter()
            .map(|&i| headers[i].to_owned())
            .collect();

        let mut weights = vec![];
        let mut ln_likelihood = vec![];
        let mut values = vec![];
        for record in reader.deserialize::<Vec<f64>>() {
            let record = record?;
            weights.push(record[i_weights]);
            ln_likelihood.push(record[i_ln_l]);
            values.extend(param_columns.iter().map(|&i| record[i]));
        }
        let samples = Array2::from_shape_vec((weights.len(), param_names.len()), values)
            .map_err(|_| FitError::NoSamples)?;
        Ok(Self {
            param_names,
            n_dims,
            samples,
            weights: Array1::from_vec(weights),
            ln_likelihood: Array1::from_vec(ln_likelihood),
            ln_evidence: f64::NAN,
            ln_evidence_err: f64::NAN,
            information: f64::NAN,
        })
    }

    /// Read `<basename>post.csv` and the evidence from `<basename>summary.json`
    pub fn load(basename: &str) -> Result<Self, FitError> {
        let summary = FitSummary::from_json_file(format!("{basename}summary.json"))?;
        let result = Self::read_csv(format!("{basename}post.csv"), summary.n_dims)?;
        Ok(Self {
            ln_evidence: summary.ln_evidence,
            ln_evidence_err: summary.ln_evidence_err,
            information: summary.information,
            ..result
        })
    }

    /// Text summary of the maximum-likelihood solution
    ///
    /// `chi2` is the chi-squared of the solution and `n_data` the number of measurements.
    pub fn write_summary_max_l(
        &self,
        path: impl AsRef<Path>,
        chi2: f64,
        n_data: usize,
    ) -> Result<(), FitError> {
        let best = self.best_fit(BestFitKind::MaxL)?;
        let max_ln_l = self.max_ln_likelihood();
        let mut file = BufWriter::new(File::create(path)?);
        writeln!(file, "{:15}  {:10.3}", "logL", max_ln_l)?;
        writeln!(file, "{:15}  {:10.3}", "AIC", calc_aic(self.n_dims, max_ln_l))?;
        writeln!(file, "{:15}  {:10.3}", "BIC", calc_bic(n_data, self.n_dims, max_ln_l))?;
        writeln!(file, "{:15}  {:10.3}", "chi2", chi2)?;
        writeln!(file, "{:15}  {:10}", "n_tot", n_data)?;
        writeln!(file)?;
        for (name, value) in best.names.iter().zip(&best.values) {
            writeln!(file, "{name:15}  {value:10.3}")?;
        }
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::results::tests::result;
    use approx::assert_relative_eq;

    #[test]
    fn posterior_table_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post.csv");
        let result = result();
        result.write_csv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("weights,logLike,t0,tE,piE_amp\n"));

        let loaded = FitResult::read_csv(&path, 2).unwrap();
        assert_eq!(loaded.param_names, result.param_names);
        assert_eq!(loaded.samples, result.samples);
        assert_eq!(loaded.weights, result.weights);
        assert!(loaded.ln_evidence.is_nan());
    }

    #[test]
    fn load_with_summary() {
        let dir = tempfile::tempdir().unwrap();
        let basename = format!("{}/1-", dir.path().display());
        let result = result();
        result.write_csv(format!("{basename}post.csv")).unwrap();
        let summary = result.summary("PsplPhot").unwrap();
        summary
            .to_json_file(format!("{basename}summary.json"))
            .unwrap();

        let loaded = FitResult::load(&basename).unwrap();
        assert_eq!(loaded, result);
        assert_eq!(summary.max_l.get("t0"), Some(102.0));
        assert_relative_eq!(summary.max_ln_likelihood, -2.0);
    }

    #[test]
    fn missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post.csv");
        std::fs::write(&path, "weights,t0\n1.0,100.0\n").unwrap();
        assert!(matches!(
            FitResult::read_csv(&path, 1),
            Err(FitError::MissingColumn(name)) if name == "logLike"
        ));
    }

    #[test]
    fn max_l_summary_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maxL_summary.txt");
        result().write_summary_max_l(&path, 12.5, 100).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "logL                 -2.000");
        assert_eq!(lines[1], "AIC                   8.000");
        assert_eq!(lines[3], "chi2                 12.500");
        assert_eq!(lines[4], "n_tot                   100");
        assert_eq!(lines[6], "t0                  102.000");
        assert_eq!(lines.len(), 6 + 3);
    }

    #[test]
    fn effective_sample_size() {
        // 1 / (0.01 + 0.16 + 0.09 + 0.04)
        assert_relative_eq!(result().effective_sample_size(), 1.0 / 0.3, max_relative = 1e-12);
    }
}
