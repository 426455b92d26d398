use crate::data::sorted_array::SortedArray;

use conv::prelude::*;
use ndarray::{Array1, ArrayView1, CowArray, Ix1, Zip, s};

pub type CowArray1<'a> = CowArray<'a, f64, Ix1>;

/// A column of an observation set with lazily cached statistics
#[derive(Clone, Debug)]
pub struct DataSample<'a> {
    pub sample: CowArray1<'a>,
    sorted: Option<SortedArray>,
    min: Option<f64>,
    max: Option<f64>,
    mean: Option<f64>,
    median: Option<f64>,
    std: Option<f64>,
    std2: Option<f64>,
}

macro_rules! data_sample_getter {
    ($attr: ident, $getter: ident, $func: expr, $method_sorted: ident) => {
        pub fn $getter(&mut self) -> f64 {
            match self.$attr {
                Some(x) => x,
                None => {
                    let x = match self.sorted.as_ref() {
                        Some(sorted) => sorted.$method_sorted(),
                        None => $func(self),
                    };
                    self.$attr = Some(x);
                    x
                }
            }
        }
    };
    ($attr: ident, $getter: ident, $func: expr) => {
        pub fn $getter(&mut self) -> f64 {
            match self.$attr {
                Some(x) => x,
                None => {
                    let x = $func(self);
                    self.$attr = Some(x);
                    x
                }
            }
        }
    };
}

impl<'a> DataSample<'a> {
    pub fn new(sample: CowArray1<'a>) -> Self {
        assert!(!sample.is_empty(), "data sample must be non-empty");
        Self {
            sample,
            sorted: None,
            min: None,
            max: None,
            mean: None,
            median: None,
            std: None,
            std2: None,
        }
    }

    #[inline]
    pub fn lenu(&self) -> usize {
        self.sample.len()
    }

    pub fn lenf(&self) -> f64 {
        self.lenu().value_as::<f64>().unwrap()
    }

    pub fn get_sorted(&mut self) -> &SortedArray {
        if self.sorted.is_none() {
            self.sorted = Some(self.sample.view().into());
        }
        self.sorted.as_ref().unwrap()
    }

    fn set_min_max(&mut self) {
        let (min, max) =
            self.sample
                .slice(s![1..])
                .fold((self.sample[0], self.sample[0]), |(min, max), &x| {
                    if x > max {
                        (min, x)
                    } else if x < min {
                        (x, max)
                    } else {
                        (min, max)
                    }
                });
        self.min = Some(min);
        self.max = Some(max);
    }

    data_sample_getter!(
        min,
        get_min,
        |ds: &mut DataSample<'a>| {
            ds.set_min_max();
            ds.min.unwrap()
        },
        minimum
    );
    data_sample_getter!(
        max,
        get_max,
        |ds: &mut DataSample<'a>| {
            ds.set_min_max();
            ds.max.unwrap()
        },
        maximum
    );
    data_sample_getter!(mean, get_mean, |ds: &mut DataSample<'a>| {
        ds.sample.sum() / ds.lenf()
    });
    data_sample_getter!(median, get_median, |ds: &mut DataSample<'a>| {
        ds.get_sorted().median()
    });
    data_sample_getter!(std, get_std, |ds: &mut DataSample<'a>| {
        ds.get_std2().sqrt()
    });
    // Population variance, the numpy default used for prior ranges
    data_sample_getter!(std2, get_std2, |ds: &mut DataSample<'a>| {
        let mean = ds.get_mean();
        ds.sample.fold(0.0, |sum, &x| sum + (x - mean).powi(2)) / ds.lenf()
    });

    /// Mean, median and standard deviation after iterative sigma clipping around the median
    ///
    /// Values outside `[median - sigma_lower * std, median + sigma_upper * std]` are rejected
    /// until nothing changes or `max_iters` is reached.
    pub fn sigma_clipped_stats(
        &self,
        sigma_lower: f64,
        sigma_upper: f64,
        max_iters: usize,
    ) -> (f64, f64, f64) {
        let mut kept: Vec<f64> = self.sample.to_vec();
        for _ in 0..max_iters {
            let mut ds = DataSample::from(kept.clone());
            let median = ds.get_median();
            let std = ds.get_std();
            let lower = median - sigma_lower * std;
            let upper = median + sigma_upper * std;
            let next: Vec<f64> = kept
                .iter()
                .copied()
                .filter(|&x| x >= lower && x <= upper)
                .collect();
            if next.len() == kept.len() || next.is_empty() {
                break;
            }
            kept = next;
        }
        let mut ds = DataSample::from(kept);
        (ds.get_mean(), ds.get_median(), ds.get_std())
    }

    /// Returns true if all values are equal
    pub fn is_all_same(&self) -> bool {
        if self.max.is_some() && self.max == self.min {
            return true;
        }
        if let Some(sorted) = &self.sorted {
            return sorted[0] == sorted[sorted.len() - 1];
        }
        let x0 = self.sample[0];
        Zip::from(self.sample.slice(s![1..])).all(|&x| x == x0)
    }
}

impl<'a> From<&'a Array1<f64>> for DataSample<'a> {
    fn from(a: &'a Array1<f64>) -> Self {
        Self::new(a.view().into())
    }
}

impl<'a> From<ArrayView1<'a, f64>> for DataSample<'a> {
    fn from(a: ArrayView1<'a, f64>) -> Self {
        Self::new(a.into())
    }
}

impl<'a> From<&'a [f64]> for DataSample<'a> {
    fn from(s: &'a [f64]) -> Self {
        ArrayView1::from(s).into()
    }
}

impl From<Vec<f64>> for DataSample<'_> {
    fn from(v: Vec<f64>) -> Self {
        Self::new(Array1::from(v).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn cached_statistics() {
        let mut ds: DataSample = vec![1.0, 5.0, 3.0, 2.0, 4.0].into();
        assert_abs_diff_eq!(ds.get_min(), 1.0);
        assert_abs_diff_eq!(ds.get_max(), 5.0);
        assert_abs_diff_eq!(ds.get_mean(), 3.0);
        assert_abs_diff_eq!(ds.get_median(), 3.0);
        assert_abs_diff_eq!(ds.get_std(), 2.0_f64.sqrt(), epsilon = 1e-12);
        assert!(!ds.is_all_same());
    }

    #[test]
    fn sigma_clipping_rejects_outlier() {
        let mut values = vec![20.0; 50];
        for (i, v) in values.iter_mut().enumerate() {
            *v += 0.01 * ((i % 5) as f64 - 2.0);
        }
        values.push(10.0);
        let ds: DataSample = values.into();
        let (mean, median, std) = ds.sigma_clipped_stats(2.0, 4.0, 5);
        assert_abs_diff_eq!(mean, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(median, 20.0, epsilon = 1e-9);
        assert!(std < 0.02);
    }

    #[test]
    fn flat_sample() {
        let ds: DataSample = vec![2.0; 4].into();
        assert!(ds.is_all_same());
    }
}
