//! Point-source binary-lens magnification
//!
//! Lens components lie on the real axis with the centre of mass at the origin, all distances
//! are in units of the Einstein radius of the total mass. The lens equation
//!
//! ```text
//! zeta = z - m1 / (conj(z) - z1) - m2 / (conj(z) - z2)
//! ```
//!
//! is turned into a complex fifth-order polynomial by substituting its own conjugate. The
//! polynomial has spurious roots, true images are the roots satisfying the lens equation.

use crate::error::ModelError;
use crate::physics::require_positive;

use num_complex::Complex64;
use num_traits::Zero;

const ABERTH_MAX_ITER: usize = 500;
const ABERTH_TOL: f64 = 1e-14;
const IMAGE_TOL: f64 = 1e-6;

/// Geometry of a binary lens
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinaryLens {
    /// Mass fraction and position of the primary
    pub m1: f64,
    pub z1: f64,
    /// Mass fraction and position of the secondary
    pub m2: f64,
    pub z2: f64,
}

impl BinaryLens {
    /// `sep` is the projected separation and `q = m2 / m1` is the mass ratio
    pub fn new(sep: f64, q: f64) -> Result<Self, ModelError> {
        let sep = require_positive("sep", sep)?;
        let q = require_positive("q", q)?;
        let m1 = 1.0 / (1.0 + q);
        let m2 = q / (1.0 + q);
        Ok(Self {
            m1,
            z1: -sep * m2,
            m2,
            z2: sep * m1,
        })
    }

    fn lens_equation(&self, z: Complex64) -> Complex64 {
        let zc = z.conj();
        z - self.m1 / (zc - self.z1) - self.m2 / (zc - self.z2)
    }

    fn jacobian_determinant(&self, z: Complex64) -> f64 {
        let zc = z.conj();
        let d = self.m1 / (zc - self.z1).powi(2) + self.m2 / (zc - self.z2).powi(2);
        1.0 - d.norm_sqr()
    }

    /// Coefficients of the image polynomial, lowest power first
    fn polynomial(&self, zeta: Complex64) -> Vec<Complex64> {
        let c = |x: f64| Complex64::new(x, 0.0);
        let zeta_conj = zeta.conj();

        // (z - z1)(z - z2)
        let d = poly_mul(&[c(-self.z1), c(1.0)], &[c(-self.z2), c(1.0)]);
        // conj(z) * d expressed through the conjugated lens equation
        let n = poly_add(
            &poly_add(
                &poly_scale(&d, zeta_conj),
                &poly_scale(&[c(-self.z2), c(1.0)], c(self.m1)),
            ),
            &poly_scale(&[c(-self.z1), c(1.0)], c(self.m2)),
        );
        let p1 = poly_add(&n, &poly_scale(&d, c(-self.z1)));
        let p2 = poly_add(&n, &poly_scale(&d, c(-self.z2)));

        let lhs = poly_mul(&poly_mul(&[-zeta, c(1.0)], &p1), &p2);
        let rhs1 = poly_scale(&poly_mul(&d, &p2), c(-self.m1));
        let rhs2 = poly_scale(&poly_mul(&d, &p1), c(-self.m2));
        poly_add(&poly_add(&lhs, &rhs1), &rhs2)
    }

    /// Positions of the images of a point source at `zeta`
    ///
    /// There are three images outside of caustics and five inside.
    pub fn images(&self, zeta: Complex64) -> Vec<Complex64> {
        let coeffs = self.polynomial(zeta);
        polynomial_roots(&coeffs)
            .into_iter()
            .filter(|&z| {
                (self.lens_equation(z) - zeta).norm() < IMAGE_TOL * (1.0 + z.norm())
            })
            .collect()
    }

    /// Total magnification of a point source at `zeta`
    pub fn magnification(&self, zeta: Complex64) -> f64 {
        self.images(zeta)
            .into_iter()
            .map(|z| self.jacobian_determinant(z).abs().recip())
            .sum()
    }
}

/// Image positions of a point source at `[x, y]`
pub fn binary_lens_images(
    source: [f64; 2],
    sep: f64,
    q: f64,
) -> Result<Vec<Complex64>, ModelError> {
    Ok(BinaryLens::new(sep, q)?.images(Complex64::new(source[0], source[1])))
}

/// Point-source binary-lens magnification at source position `[x, y]`
///
/// The x axis goes from the primary to the secondary.
pub fn psbl_amplification(source: [f64; 2], sep: f64, q: f64) -> Result<f64, ModelError> {
    Ok(BinaryLens::new(sep, q)?.magnification(Complex64::new(source[0], source[1])))
}

fn poly_mul(a: &[Complex64], b: &[Complex64]) -> Vec<Complex64> {
    let mut result = vec![Complex64::zero(); a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            result[i + j] += x * y;
        }
    }
    result
}

fn poly_add(a: &[Complex64], b: &[Complex64]) -> Vec<Complex64> {
    let n = a.len().max(b.len());
    (0..n)
        .map(|i| {
            a.get(i).copied().unwrap_or_else(Complex64::zero)
                + b.get(i).copied().unwrap_or_else(Complex64::zero)
        })
        .collect()
}

fn poly_scale(a: &[Complex64], s: Complex64) -> Vec<Complex64> {
    a.iter().map(|&x| x * s).collect()
}

/// Value and derivative of the polynomial at `z` by Horner's scheme
fn poly_eval(coeffs: &[Complex64], z: Complex64) -> (Complex64, Complex64) {
    coeffs
        .iter()
        .rev()
        .fold((Complex64::zero(), Complex64::zero()), |(p, dp), &a| {
            (p * z + a, dp * z + p)
        })
}

/// All complex roots of a polynomial with Aberth-Ehrlich iterations
fn polynomial_roots(coeffs: &[Complex64]) -> Vec<Complex64> {
    let degree = match coeffs.iter().rposition(|c| c.norm() > 0.0) {
        Some(d) if d > 0 => d,
        _ => return vec![],
    };
    let coeffs = &coeffs[..=degree];
    let leading = coeffs[degree];

    // Cauchy bound of the root moduli
    let radius = 1.0
        + coeffs[..degree]
            .iter()
            .map(|&c| (c / leading).norm())
            .fold(0.0, f64::max);
    let mut roots: Vec<Complex64> = (0..degree)
        .map(|k| {
            let angle = std::f64::consts::TAU * k as f64 / degree as f64 + 0.4;
            Complex64::from_polar(0.5 * radius, angle)
        })
        .collect();

    for _ in 0..ABERTH_MAX_ITER {
        let mut max_step: f64 = 0.0;
        for k in 0..degree {
            let (p, dp) = poly_eval(coeffs, roots[k]);
            if p.is_zero() {
                continue;
            }
            let ratio = p / dp;
            let repulsion: Complex64 = (0..degree)
                .filter(|&j| j != k)
                .map(|j| (roots[k] - roots[j]).inv())
                .sum();
            let step = ratio / (Complex64::new(1.0, 0.0) - ratio * repulsion);
            roots[k] -= step;
            max_step = max_step.max(step.norm() / (1.0 + roots[k].norm()));
        }
        if max_step < ABERTH_TOL {
            break;
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::physics::magnification::pspl_amplification;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn roots_of_known_polynomial() {
        // (z - 1)(z + 2)(z - i)
        let c = |re: f64, im: f64| Complex64::new(re, im);
        let coeffs = poly_mul(
            &poly_mul(&[c(-1.0, 0.0), c(1.0, 0.0)], &[c(2.0, 0.0), c(1.0, 0.0)]),
            &[c(0.0, -1.0), c(1.0, 0.0)],
        );
        let mut roots = polynomial_roots(&coeffs);
        roots.sort_by(|a, b| a.re.total_cmp(&b.re));
        assert_abs_diff_eq!(roots[0].re, -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(roots[1].im, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(roots[2].re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn low_mass_ratio_reduces_to_single_lens() {
        let source = [0.3, 0.2];
        let u = f64::hypot(source[0], source[1]);
        assert_relative_eq!(
            psbl_amplification(source, 3.0, 1e-9).unwrap(),
            pspl_amplification(u),
            max_relative = 1e-6
        );
    }

    #[test]
    fn distant_source_is_unmagnified() {
        let a = psbl_amplification([10.0, 10.0], 1.0, 1.0).unwrap();
        assert_abs_diff_eq!(a, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn image_count_is_three_or_five() {
        let lens = BinaryLens::new(1.0, 1.0).unwrap();
        for &(x, y) in &[(0.0, 0.0), (0.05, 0.01), (0.5, 0.5), (-1.3, 0.2), (2.0, -1.0)] {
            let n = lens.images(Complex64::new(x, y)).len();
            assert!(n == 3 || n == 5, "{n} images for ({x}, {y})");
        }
        // Inside the central caustic of an equal-mass resonant binary
        assert_eq!(binary_lens_images([0.0, 0.0], 1.0, 1.0).unwrap().len(), 5);
    }

    #[test]
    fn equal_mass_binary_is_symmetric() {
        let amplification = |x: f64, y: f64| psbl_amplification([x, y], 1.2, 1.0).unwrap();
        let a = amplification(0.3, 0.25);
        assert_relative_eq!(a, amplification(0.3, -0.25), max_relative = 1e-9);
        assert_relative_eq!(a, amplification(-0.3, 0.25), max_relative = 1e-9);
    }

    #[test]
    fn centre_of_mass_frame() {
        let lens = BinaryLens::new(2.0, 0.25).unwrap();
        assert_relative_eq!(lens.m1 * lens.z1 + lens.m2 * lens.z2, 0.0);
        assert_relative_eq!(lens.z2 - lens.z1, 2.0);
        assert_relative_eq!(lens.m1 + lens.m2, 1.0);
    }

    #[test]
    fn invalid_lens_is_an_error() {
        for (sep, q) in [(0.0, 1.0), (-1.0, 1.0), (1.0, 0.0), (1.0, f64::NAN)] {
            assert!(matches!(
                BinaryLens::new(sep, q),
                Err(ModelError::Unphysical { .. })
            ));
        }
        assert!(matches!(
            psbl_amplification([0.1, 0.1], 1.0, -1e-3),
            Err(ModelError::Unphysical { name: "q", .. })
        ));
        assert!(binary_lens_images([0.1, 0.1], 0.0, 1.0).is_err());
    }
}
