use crate::error::DataError;

use itertools::Itertools;
use ndarray::Array1;

pub(super) fn check_len(name: &str, a: &Array1<f64>, b: &Array1<f64>) -> Result<(), DataError> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(DataError::LengthMismatch {
            name: name.to_owned(),
            left: a.len(),
            right: b.len(),
        })
    }
}

pub(super) fn check_finite(
    name: &str,
    column: &'static str,
    a: &Array1<f64>,
) -> Result<(), DataError> {
    if a.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(DataError::NonFinite {
            name: name.to_owned(),
            column,
        })
    }
}

pub(super) fn check_errors(
    name: &str,
    column: &'static str,
    a: &Array1<f64>,
) -> Result<(), DataError> {
    if a.iter().all(|&x| x > 0.0) {
        Ok(())
    } else {
        Err(DataError::NonPositiveError {
            name: name.to_owned(),
            column,
        })
    }
}

pub(super) fn check_sorted(name: &str, t: &Array1<f64>) -> Result<(), DataError> {
    if t.iter().tuple_windows().all(|(a, b)| a <= b) {
        Ok(())
    } else {
        Err(DataError::Unsorted(name.to_owned()))
    }
}
