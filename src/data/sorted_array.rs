use crate::error::DataError;

use conv::prelude::*;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

// Underlying array is guaranteed to be sorted and contiguous
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SortedArray(pub Array1<f64>);

impl SortedArray {
    pub fn from_sorted(sorted_array: impl Into<Array1<f64>>) -> Result<Self, DataError> {
        let sorted_array = sorted_array.into();
        let is_sorted = sorted_array
            .as_slice()
            .map(|s| s.is_sorted())
            .unwrap_or(false);
        if is_sorted {
            Ok(Self(sorted_array))
        } else {
            Err(DataError::Unsorted("SortedArray".into()))
        }
    }

    pub fn maximum(&self) -> f64 {
        self[self.len() - 1]
    }

    pub fn minimum(&self) -> f64 {
        self[0]
    }

    pub fn median(&self) -> f64 {
        assert_ne!(self.len(), 0);
        let i = (self.len() - 1) / 2;
        if self.len() % 2 == 0 {
            0.5 * (self[i] + self[i + 1])
        } else {
            self[i]
        }
    }

    // R-5 from https://en.wikipedia.org/wiki/Quantile
    pub fn ppf(&self, q: f64) -> f64 {
        assert_ne!(self.len(), 0);
        assert!(
            (0.0..=1.0).contains(&q),
            "quantile should be between zero and unity"
        );
        let h = self.len().value_as::<f64>().unwrap() * q - 0.5;
        let h_floor = h.floor();
        if h_floor < 0.0 {
            self.minimum()
        } else {
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            let i = h_floor as usize;
            if i >= self.len() - 1 {
                self.maximum()
            } else {
                self[i] + (h - h_floor) * (self[i + 1] - self[i])
            }
        }
    }
}

impl From<Vec<f64>> for SortedArray {
    fn from(mut v: Vec<f64>) -> Self {
        v.sort_unstable_by(f64::total_cmp);
        Self(Array1::from_vec(v))
    }
}

impl From<&[f64]> for SortedArray {
    fn from(s: &[f64]) -> Self {
        s.to_vec().into()
    }
}

impl From<ArrayView1<'_, f64>> for SortedArray {
    fn from(v: ArrayView1<'_, f64>) -> Self {
        v.to_vec().into()
    }
}

impl Deref for SortedArray {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        // Constructors only build standard-layout arrays
        self.0.as_slice().unwrap()
    }
}

impl AsRef<[f64]> for SortedArray {
    fn as_ref(&self) -> &[f64] {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn median_is_middle_element() {
        let a: SortedArray = vec![3.0, 1.0, 2.0].into();
        assert_abs_diff_eq!(a.median(), 2.0);
        let a: SortedArray = vec![4.0, 1.0, 3.0, 2.0].into();
        assert_abs_diff_eq!(a.median(), 2.5);
    }

    #[test]
    fn ppf_bounds() {
        let a: SortedArray = (0..10).map(f64::from).collect::<Vec<_>>().into();
        assert_abs_diff_eq!(a.ppf(0.0), 0.0);
        assert_abs_diff_eq!(a.ppf(1.0), 9.0);
        assert_abs_diff_eq!(a.ppf(0.5), 4.5);
    }

    #[test]
    fn from_sorted_rejects_unsorted() {
        assert!(SortedArray::from_sorted(vec![1.0, 0.0]).is_err());
        assert!(SortedArray::from_sorted(vec![0.0, 1.0]).is_ok());
    }
}
