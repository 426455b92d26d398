use ndarray::Array1;

// Plain arrays keep the crate independent of microlensing-fit types
/// Time, magnitude and magnitude error
pub type TripleArray = (Array1<f64>, Array1<f64>, Array1<f64>);
