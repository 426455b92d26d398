use ndarray::Array1;
use rand::prelude::*;
use rand_distr::Normal;

/// `n` evenly spaced times from `start` to `end` inclusive
pub fn uniform_times(start: f64, end: f64, n: usize) -> Array1<f64> {
    Array1::linspace(start, end, n)
}

/// Reproducible zero-mean normal noise
pub fn gaussian_noise(n: usize, sigma: f64, seed: u64) -> Array1<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, sigma).unwrap();
    Array1::from_shape_simple_fn(n, || normal.sample(&mut rng))
}
