use crate::data::validate::{check_errors, check_finite, check_len, check_sorted};
use crate::error::DataError;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Light curve of one photometric band
///
/// `t` is time in MJD, `mag` and `mag_err` are magnitudes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Photometry {
    pub name: String,
    pub t: Array1<f64>,
    pub mag: Array1<f64>,
    pub mag_err: Array1<f64>,
}

impl Photometry {
    /// Construct a validated band
    ///
    /// All arrays must have the same non-zero length, values must be finite, errors positive,
    /// and `t` must be non-decreasing.
    pub fn new(
        name: impl Into<String>,
        t: impl Into<Array1<f64>>,
        mag: impl Into<Array1<f64>>,
        mag_err: impl Into<Array1<f64>>,
    ) -> Result<Self, DataError> {
        let name = name.into();
        let t = t.into();
        let mag = mag.into();
        let mag_err = mag_err.into();

        check_len(&name, &t, &mag)?;
        check_len(&name, &t, &mag_err)?;
        if t.is_empty() {
            return Err(DataError::Empty(name));
        }
        check_finite(&name, "t", &t)?;
        check_finite(&name, "mag", &mag)?;
        check_finite(&name, "mag_err", &mag_err)?;
        check_errors(&name, "mag_err", &mag_err)?;
        check_sorted(&name, &t)?;

        Ok(Self {
            name,
            t,
            mag,
            mag_err,
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
    fn valid_band() {
        let phot = Photometry::new(
            "I",
            vec![0.0, 1.0, 2.0],
            vec![19.0, 18.5, 19.0],
            vec![0.01; 3],
        )
        .unwrap();
        assert_eq!(phot.len(), 3);
    }

    #[test]
    fn invalid_bands() {
        assert_eq!(
            Photometry::new("I", vec![0.0, 1.0], vec![19.0], vec![0.01]),
            Err(DataError::LengthMismatch {
                name: "I".into(),
                left: 2,
                right: 1
            })
        );
        assert_eq!(
            Photometry::new("I", Vec::<f64>::new(), Vec::<f64>::new(), Vec::<f64>::new()),
            Err(DataError::Empty("I".into()))
        );
        assert!(matches!(
            Photometry::new("I", vec![0.0, 1.0], vec![19.0, 19.0], vec![0.01, 0.0]),
            Err(DataError::NonPositiveError { .. })
        ));
        assert!(matches!(
            Photometry::new("I", vec![1.0, 0.0], vec![19.0, 19.0], vec![0.01, 0.01]),
            Err(DataError::Unsorted(_))
        ));
        assert!(matches!(
            Photometry::new("I", vec![0.0, 1.0], vec![f64::NAN, 19.0], vec![0.01, 0.01]),
            Err(DataError::NonFinite { column: "mag", .. })
        ));
    }
}
