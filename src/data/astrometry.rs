use crate::data::validate::{check_errors, check_finite, check_len, check_sorted};
use crate::error::DataError;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Astrometric time series of one filter
///
/// `t` is time in MJD, `x` is the East-West offset increasing to the East and `y` is the
/// North-South offset increasing to the North, both in arcsec.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Astrometry {
    pub name: String,
    pub t: Array1<f64>,
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub x_err: Array1<f64>,
    pub y_err: Array1<f64>,
}

impl Astrometry {
    pub fn new(
        name: impl Into<String>,
        t: impl Into<Array1<f64>>,
        x: impl Into<Array1<f64>>,
        y: impl Into<Array1<f64>>,
        x_err: impl Into<Array1<f64>>,
        y_err: impl Into<Array1<f64>>,
    ) -> Result<Self, DataError> {
        let name = name.into();
        let t = t.into();
        let x = x.into();
        let y = y.into();
        let x_err = x_err.into();
        let y_err = y_err.into();

        for column in [&x, &y, &x_err, &y_err] {
            check_len(&name, &t, column)?;
        }
        if t.is_empty() {
            return Err(DataError::Empty(name));
        }
        check_finite(&name, "t", &t)?;
        check_finite(&name, "x", &x)?;
        check_finite(&name, "y", &y)?;
        check_finite(&name, "x_err", &x_err)?;
        check_finite(&name, "y_err", &y_err)?;
        check_errors(&name, "x_err", &x_err)?;
        check_errors(&name, "y_err", &y_err)?;
        check_sorted(&name, &t)?;

        Ok(Self {
            name,
            t,
            x,
            y,
            x_err,
            y_err,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.t.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_must_be_positive() {
        let result = Astrometry::new(
            "Kp",
            vec![0.0, 10.0],
            vec![0.0, 0.001],
            vec![0.0, 0.001],
            vec![1e-4, 1e-4],
            vec![1e-4, -1e-4],
        );
        assert_eq!(
            result,
            Err(DataError::NonPositiveError {
                name: "Kp".into(),
                column: "y_err"
            })
        );
    }
}
