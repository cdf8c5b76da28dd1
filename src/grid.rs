//! Equiangular spin-weighted samples on the sphere, and pointwise algebra

use std::ops::{Add, Div, Index, Mul, Sub};

use num_complex::Complex64;

use crate::boost::BoostVelocity;
use crate::error::ScriError;
use crate::swsh;

/// Complex spin-weighted field sampled on an equiangular lattice.
///
/// The lattice has `n_theta` colatitude rows including both poles and `n_phi`
/// azimuth columns, stored row-major. This representation exists for pointwise
/// nonlinear algebra; [crate::modes::AngularModes] is preferred everywhere a
/// spectral operation suffices.
#[derive(Debug, Clone)]
pub struct AngularGrid {
    spin: i32,
    n_theta: usize,
    n_phi: usize,
    data: Box<[Complex64]>,
}

impl AngularGrid {
    /// Wrap existing samples. Fails with [ScriError::ShapeMismatch] if the
    /// sample count is not `n_theta * n_phi` or the lattice has fewer than two
    /// colatitude rows.
    pub fn new(
        spin: i32,
        n_theta: usize,
        n_phi: usize,
        data: Box<[Complex64]>,
    ) -> Result<AngularGrid, ScriError> {
        if n_theta < 2 || n_phi == 0 || data.len() != n_theta * n_phi {
            return Err(ScriError::ShapeMismatch(
                "AngularGrid::new",
                format!("{} samples for a {n_theta}x{n_phi} lattice", data.len()),
            ));
        }

        Ok(AngularGrid {
            spin,
            n_theta,
            n_phi,
            data,
        })
    }

    /// Sample a function of direction `(theta, phi)` over the lattice
    pub fn from_fn(
        spin: i32,
        n_theta: usize,
        n_phi: usize,
        mut f: impl FnMut(f64, f64) -> Complex64,
    ) -> Result<AngularGrid, ScriError> {
        if n_theta < 2 || n_phi == 0 {
            return Err(ScriError::ShapeMismatch(
                "AngularGrid::from_fn",
                format!("degenerate {n_theta}x{n_phi} lattice"),
            ));
        }

        let mut data = Vec::with_capacity(n_theta * n_phi);

        for j in 0..n_theta {
            for k in 0..n_phi {
                data.push(f(swsh::theta_node(j, n_theta), swsh::phi_node(k, n_phi)));
            }
        }

        AngularGrid::new(spin, n_theta, n_phi, data.into_boxed_slice())
    }

    /// Spin weight carried by the samples
    pub fn spin(&self) -> i32 {
        self.spin
    }

    /// Number of colatitude rows (poles included)
    pub fn n_theta(&self) -> usize {
        self.n_theta
    }

    /// Number of azimuth columns
    pub fn n_phi(&self) -> usize {
        self.n_phi
    }

    /// Total number of samples
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid holds no samples (never true for a valid grid)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All samples in row-major order
    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    fn check_resolution(&self, other: &AngularGrid, op: &'static str) -> Result<(), ScriError> {
        if self.n_theta != other.n_theta || self.n_phi != other.n_phi {
            return Err(ScriError::ShapeMismatch(
                op,
                format!(
                    "{}x{} against {}x{}",
                    self.n_theta, self.n_phi, other.n_theta, other.n_phi
                ),
            ));
        }

        Ok(())
    }

    fn pointwise(
        &self,
        other: &AngularGrid,
        spin: i32,
        f: impl Fn(Complex64, Complex64) -> Complex64,
    ) -> AngularGrid {
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();

        AngularGrid {
            spin,
            n_theta: self.n_theta,
            n_phi: self.n_phi,
            data,
        }
    }

    /// Pointwise product; the result has spin `s1 + s2`
    pub fn mul(&self, other: &AngularGrid) -> Result<AngularGrid, ScriError> {
        self.check_resolution(other, "AngularGrid::mul")?;
        Ok(self.pointwise(other, self.spin + other.spin, |a, b| a * b))
    }

    /// Pointwise quotient; the result has spin `s1 - s2`
    pub fn div(&self, other: &AngularGrid) -> Result<AngularGrid, ScriError> {
        self.check_resolution(other, "AngularGrid::div")?;
        Ok(self.pointwise(other, self.spin - other.spin, |a, b| a / b))
    }

    /// Pointwise sum of two grids of equal spin
    pub fn add(&self, other: &AngularGrid) -> Result<AngularGrid, ScriError> {
        self.check_resolution(other, "AngularGrid::add")?;

        if self.spin != other.spin {
            return Err(ScriError::ShapeMismatch(
                "AngularGrid::add",
                format!("spin {} against spin {}", self.spin, other.spin),
            ));
        }

        Ok(self.pointwise(other, self.spin, |a, b| a + b))
    }

    /// Pointwise difference of two grids of equal spin
    pub fn sub(&self, other: &AngularGrid) -> Result<AngularGrid, ScriError> {
        self.check_resolution(other, "AngularGrid::sub")?;

        if self.spin != other.spin {
            return Err(ScriError::ShapeMismatch(
                "AngularGrid::sub",
                format!("spin {} against spin {}", self.spin, other.spin),
            ));
        }

        Ok(self.pointwise(other, self.spin, |a, b| a - b))
    }

    /// Sample-wise integer power; the result has spin `p * s`.
    ///
    /// Raising a bandlimited field to a power raises its effective degree, so
    /// the caller is responsible for having built this grid at a resolution
    /// large enough for the result (conventionally scaled by `p`).
    pub fn pow(&self, p: i32) -> AngularGrid {
        AngularGrid {
            spin: p * self.spin,
            n_theta: self.n_theta,
            n_phi: self.n_phi,
            data: self.data.iter().map(|x| x.powi(p)).collect(),
        }
    }

    fn map(&self, spin: i32, f: impl Fn(Complex64) -> Complex64) -> AngularGrid {
        AngularGrid {
            spin,
            n_theta: self.n_theta,
            n_phi: self.n_phi,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }
}

impl Index<usize> for AngularGrid {
    type Output = Complex64;

    fn index(&self, i: usize) -> &Complex64 {
        &self.data[i]
    }
}

impl Mul<f64> for &AngularGrid {
    type Output = AngularGrid;

    fn mul(self, a: f64) -> AngularGrid {
        self.map(self.spin, |x| a * x)
    }
}

impl Mul<&AngularGrid> for f64 {
    type Output = AngularGrid;

    fn mul(self, g: &AngularGrid) -> AngularGrid {
        g * self
    }
}

impl Div<f64> for &AngularGrid {
    type Output = AngularGrid;

    fn div(self, a: f64) -> AngularGrid {
        self.map(self.spin, |x| x / a)
    }
}

impl Div<&AngularGrid> for f64 {
    type Output = AngularGrid;

    fn div(self, g: &AngularGrid) -> AngularGrid {
        g.map(g.spin, |x| self / x)
    }
}

impl Add<f64> for &AngularGrid {
    type Output = AngularGrid;

    fn add(self, a: f64) -> AngularGrid {
        self.map(self.spin, |x| x + a)
    }
}

impl Add<&AngularGrid> for f64 {
    type Output = AngularGrid;

    fn add(self, g: &AngularGrid) -> AngularGrid {
        g + self
    }
}

impl Sub<f64> for &AngularGrid {
    type Output = AngularGrid;

    fn sub(self, a: f64) -> AngularGrid {
        self.map(self.spin, |x| x - a)
    }
}

impl Sub<&AngularGrid> for f64 {
    type Output = AngularGrid;

    fn sub(self, g: &AngularGrid) -> AngularGrid {
        g.map(g.spin, |x| self - x)
    }
}

/// Conformal factor `K(v, n) = gamma * (1 - v.n)` sampled over the lattice
pub fn conformal_factor_grid(
    v: &BoostVelocity,
    n_theta: usize,
    n_phi: usize,
) -> Result<AngularGrid, ScriError> {
    AngularGrid::from_fn(0, n_theta, n_phi, |theta, phi| {
        Complex64::new(v.conformal_factor(&BoostVelocity::direction(theta, phi)), 0.)
    })
}

/// Inverse conformal factor `1/K(v, n)` sampled over the lattice
pub fn inverse_conformal_factor_grid(
    v: &BoostVelocity,
    n_theta: usize,
    n_phi: usize,
) -> Result<AngularGrid, ScriError> {
    AngularGrid::from_fn(0, n_theta, n_phi, |theta, phi| {
        Complex64::new(
            1. / v.conformal_factor(&BoostVelocity::direction(theta, phi)),
            0.,
        )
    })
}

/// Inverse conformal factor evaluated at the boosted (aberrated) direction of
/// each lattice point, `gamma * (1 + v.n')`.
///
/// This is the factor that multiplies fields of conformal weight one when the
/// lattice points are directions in the *new* frame and the field data live in
/// the source frame.
pub fn inverse_conformal_factor_boosted_grid(
    v: &BoostVelocity,
    n_theta: usize,
    n_phi: usize,
) -> Result<AngularGrid, ScriError> {
    AngularGrid::from_fn(0, n_theta, n_phi, |theta, phi| {
        Complex64::new(
            v.inverse_conformal_factor_boosted(&BoostVelocity::direction(theta, phi)),
            0.,
        )
    })
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;
    use num_complex::Complex64;

    use crate::boost::BoostVelocity;
    use crate::error::ScriError;

    use super::{conformal_factor_grid, inverse_conformal_factor_boosted_grid, AngularGrid};

    fn constant(spin: i32, n: usize, value: Complex64) -> AngularGrid {
        AngularGrid::from_fn(spin, n, n, |_, _| value).unwrap()
    }

    #[test]
    fn sample_count_is_enforced() {
        let data = vec![Complex64::new(1., 0.); 10].into_boxed_slice();
        assert!(matches!(
            AngularGrid::new(0, 3, 4, data),
            Err(ScriError::ShapeMismatch(..))
        ));
    }

    #[test]
    fn resolution_mismatch_is_an_error() {
        let a = constant(0, 5, Complex64::new(1., 0.));
        let b = constant(0, 7, Complex64::new(1., 0.));
        assert!(matches!(a.mul(&b), Err(ScriError::ShapeMismatch(..))));
    }

    #[test]
    fn spins_add_under_multiplication() {
        let a = constant(2, 5, Complex64::new(2., 1.));
        let b = constant(-1, 5, Complex64::new(0., 1.));

        let product = a.mul(&b).unwrap();
        assert_eq!(product.spin(), 1);
        assert!((product[0] - Complex64::new(-1., 2.)).norm() < 1e-15);

        let quotient = product.div(&b).unwrap();
        assert_eq!(quotient.spin(), 2);
        assert!((quotient[7] - a[7]).norm() < 1e-14);
    }

    #[test]
    fn mismatched_spins_do_not_add() {
        let a = constant(2, 5, Complex64::new(1., 0.));
        let b = constant(0, 5, Complex64::new(1., 0.));
        assert!(matches!(a.add(&b), Err(ScriError::ShapeMismatch(..))));
    }

    #[test]
    fn scalars_broadcast_and_preserve_spin() {
        let a = constant(-2, 5, Complex64::new(3., -1.));

        let b = 2. * &a;
        assert_eq!(b.spin(), -2);
        assert!((b[3] - Complex64::new(6., -2.)).norm() < 1e-15);

        let c = &a + 1.;
        assert!((c[0] - Complex64::new(4., -1.)).norm() < 1e-15);
    }

    #[test]
    fn pow_scales_spin() {
        let a = constant(2, 5, Complex64::new(0., 1.));
        let b = a.pow(2);
        assert_eq!(b.spin(), 4);
        assert!((b[0] - Complex64::new(-1., 0.)).norm() < 1e-15);
    }

    #[test]
    fn conformal_factor_at_rest_is_one() {
        let v = BoostVelocity::zero();
        let k = conformal_factor_grid(&v, 5, 5).unwrap();

        for i in 0..k.len() {
            assert!((k[i] - Complex64::new(1., 0.)).norm() < 1e-15);
        }
    }

    #[test]
    fn conformal_factor_along_boost_axis() {
        let beta = 0.3;
        let v = BoostVelocity::new(Vector3::new(0., 0., beta)).unwrap();
        let gamma = 1. / (1. - beta * beta).sqrt();

        let k = conformal_factor_grid(&v, 5, 4).unwrap();
        // North pole (n = +z) occupies the first row
        assert!((k[0].re - gamma * (1. - beta)).abs() < 1e-14);
        // South pole the last row
        assert!((k[k.len() - 1].re - gamma * (1. + beta)).abs() < 1e-14);

        // At the poles the aberrated direction coincides with the lattice
        // direction, so the boosted inverse is the exact reciprocal.
        let kb = inverse_conformal_factor_boosted_grid(&v, 5, 4).unwrap();
        assert!((kb[0].re - gamma * (1. + beta)).abs() < 1e-14);
        assert!((kb[0].re * k[0].re - 1.).abs() < 1e-14);
    }
}
