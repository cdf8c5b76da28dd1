//! Spin-weighted spherical-harmonic coefficient representation

use nalgebra::UnitQuaternion;
use num_complex::Complex64;

use crate::error::ScriError;
use crate::grid::AngularGrid;
use crate::swsh;

/// Smallest lattice resolution free of aliasing for fields bandlimited at
/// `ell_max`
pub fn default_resolution(ell_max: u32) -> usize {
    (2 * ell_max as usize + 1).max(2)
}

/// Complex spin-weighted field on the sphere as a dense sequence of mode
/// coefficients.
///
/// All `(ell, m)` pairs with `0 <= ell <= ell_max` are present, even where the
/// field necessarily vanishes for `ell < |s|`, stored in the canonical order
/// `(0,0), (1,-1), (1,0), (1,1), (2,-2), ...`. Linear spectral operations act
/// here; nonlinear algebra is delegated to [AngularGrid] through an explicit
/// transform round trip.
#[derive(Debug, Clone)]
pub struct AngularModes {
    spin: i32,
    ell_max: u32,
    data: Box<[Complex64]>,
}

impl AngularModes {
    /// Wrap a dense coefficient sequence. The length must be
    /// `(ell_max + 1)^2`.
    pub fn new(spin: i32, ell_max: u32, data: Box<[Complex64]>) -> Result<AngularModes, ScriError> {
        let expected = (ell_max as usize + 1) * (ell_max as usize + 1);

        if data.len() != expected {
            return Err(ScriError::ShapeMismatch(
                "AngularModes::new",
                format!("{} coefficients, expected {expected}", data.len()),
            ));
        }

        Ok(AngularModes {
            spin,
            ell_max,
            data,
        })
    }

    /// The zero field at a given spin and degree
    pub fn zeros(spin: i32, ell_max: u32) -> AngularModes {
        let len = (ell_max as usize + 1) * (ell_max as usize + 1);

        AngularModes {
            spin,
            ell_max,
            data: vec![Complex64::new(0., 0.); len].into_boxed_slice(),
        }
    }

    /// Spin weight of the field
    pub fn spin(&self) -> i32 {
        self.spin
    }

    /// Maximum angular degree retained
    pub fn ell_max(&self) -> u32 {
        self.ell_max
    }

    /// Number of stored coefficients, `(ell_max + 1)^2`
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no coefficients are stored (never true for a valid object)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All coefficients in canonical order
    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    /// Coefficient of `(ell, m)`; zero beyond the stored degree
    pub fn coefficient(&self, ell: u32, m: i32) -> Complex64 {
        if ell > self.ell_max || m.unsigned_abs() > ell {
            return Complex64::new(0., 0.);
        }

        self.data[swsh::lm_index(ell, m)]
    }

    /// Set the coefficient of `(ell, m)`
    pub fn set_coefficient(&mut self, ell: u32, m: i32, value: Complex64) -> Result<(), ScriError> {
        if ell > self.ell_max || m.unsigned_abs() > ell {
            return Err(ScriError::IndexOutOfRange(
                swsh::lm_index(ell.min(self.ell_max + 1), m),
                self.data.len() - 1,
            ));
        }

        self.data[swsh::lm_index(ell, m)] = value;
        Ok(())
    }

    /// Copy into a (possibly) higher maximum degree, padding with zeros
    pub fn padded(&self, ell_max: u32) -> AngularModes {
        let mut out = AngularModes::zeros(self.spin, ell_max.max(self.ell_max));

        for ell in 0..=self.ell_max {
            for m in -(ell as i32)..=(ell as i32) {
                out.data[swsh::lm_index(ell, m)] = self.data[swsh::lm_index(ell, m)];
            }
        }

        out
    }

    /// Analyze an equiangular grid into modes up to `ell_max`.
    ///
    /// The grid must resolve the requested band limit,
    /// `n_theta, n_phi >= 2*ell_max + 1`, or the quadrature would alias.
    pub fn from_grid(grid: &AngularGrid, ell_max: u32) -> Result<AngularModes, ScriError> {
        let needed = default_resolution(ell_max);

        if grid.n_theta() < needed || grid.n_phi() < 2 * ell_max as usize + 1 {
            return Err(ScriError::ShapeMismatch(
                "AngularModes::from_grid",
                format!(
                    "{}x{} grid cannot resolve ell_max = {ell_max}",
                    grid.n_theta(),
                    grid.n_phi()
                ),
            ));
        }

        let data = swsh::grid_to_modes(grid.spin(), grid.n_theta(), grid.n_phi(), grid.data(), ell_max);

        AngularModes::new(grid.spin(), ell_max, data.into_boxed_slice())
    }

    /// Synthesize the field on an equiangular lattice.
    ///
    /// `n_phi` must exceed `2*ell_max` so every azimuthal order has its own
    /// frequency bin.
    pub fn to_grid(&self, n_theta: usize, n_phi: usize) -> Result<AngularGrid, ScriError> {
        if n_theta < 2 || n_phi < 2 * self.ell_max as usize + 1 {
            return Err(ScriError::ShapeMismatch(
                "AngularModes::to_grid",
                format!(
                    "{n_theta}x{n_phi} lattice cannot hold ell_max = {}",
                    self.ell_max
                ),
            ));
        }

        let data = swsh::modes_to_grid(self.spin, self.ell_max, &self.data, n_theta, n_phi);

        AngularGrid::new(self.spin, n_theta, n_phi, data.into_boxed_slice())
    }

    /// Sum of two fields of equal spin, padded to the larger degree
    pub fn add(&self, other: &AngularModes) -> Result<AngularModes, ScriError> {
        self.combine(other, "AngularModes::add", |a, b| a + b)
    }

    /// Difference of two fields of equal spin, padded to the larger degree
    pub fn sub(&self, other: &AngularModes) -> Result<AngularModes, ScriError> {
        self.combine(other, "AngularModes::sub", |a, b| a - b)
    }

    fn combine(
        &self,
        other: &AngularModes,
        op: &'static str,
        f: impl Fn(Complex64, Complex64) -> Complex64,
    ) -> Result<AngularModes, ScriError> {
        if self.spin != other.spin {
            return Err(ScriError::ShapeMismatch(
                op,
                format!("spin {} against spin {}", self.spin, other.spin),
            ));
        }

        let ell_max = self.ell_max.max(other.ell_max);
        let mut out = AngularModes::zeros(self.spin, ell_max);

        for ell in 0..=ell_max {
            for m in -(ell as i32)..=(ell as i32) {
                out.data[swsh::lm_index(ell, m)] =
                    f(self.coefficient(ell, m), other.coefficient(ell, m));
            }
        }

        Ok(out)
    }

    /// Scale every coefficient by a real factor
    pub fn scale(&self, a: f64) -> AngularModes {
        AngularModes {
            spin: self.spin,
            ell_max: self.ell_max,
            data: self.data.iter().map(|&x| a * x).collect(),
        }
    }

    /// Product of two fields, computed pointwise on a working grid.
    ///
    /// The result carries spin `s1 + s2` and degree `l1 + l2`; the working
    /// resolution defaults to `2*(l1 + l2) + 1`, which keeps the product free
    /// of aliasing. Use [AngularModes::mul_at_resolution] to control the
    /// precision/cost trade-off explicitly.
    pub fn mul(&self, other: &AngularModes) -> Result<AngularModes, ScriError> {
        let ell_out = self.ell_max + other.ell_max;
        let res = default_resolution(ell_out);

        self.mul_at_resolution(other, res, res, ell_out)
    }

    /// Product on an explicitly chosen working lattice and output degree
    pub fn mul_at_resolution(
        &self,
        other: &AngularModes,
        n_theta: usize,
        n_phi: usize,
        ell_max_out: u32,
    ) -> Result<AngularModes, ScriError> {
        let product = self
            .to_grid(n_theta, n_phi)?
            .mul(&other.to_grid(n_theta, n_phi)?)?;

        AngularModes::from_grid(&product, ell_max_out)
    }

    /// Quotient of two fields, computed pointwise on a working grid.
    ///
    /// Quotients of bandlimited fields are generally not bandlimited; the
    /// output degree defaults to `max(l1, l2)` and the working resolution to
    /// `2*(l1 + l2) + 1`. This is a documented truncation, not an error.
    pub fn div(&self, other: &AngularModes) -> Result<AngularModes, ScriError> {
        let res = default_resolution(self.ell_max + other.ell_max);
        let ell_out = self.ell_max.max(other.ell_max);

        let quotient = self
            .to_grid(res, res)?
            .div(&other.to_grid(res, res)?)?;

        AngularModes::from_grid(&quotient, ell_out)
    }

    /// Integer power, computed pointwise and truncated at degree
    /// `ell_max * p`. The working lattice is sized for the larger of the
    /// input and output degrees, so `pow(0)` yields the constant one field.
    pub fn pow(&self, p: u32) -> Result<AngularModes, ScriError> {
        let ell_out = self.ell_max * p;
        let res = default_resolution(self.ell_max.max(ell_out));

        let grid = self.to_grid(res, res)?.pow(p as i32);

        AngularModes::from_grid(&grid, ell_out)
    }

    /// The complex conjugate field, with spin weight negated
    pub fn bar(&self) -> AngularModes {
        let mut out = AngularModes::zeros(-self.spin, self.ell_max);

        for ell in 0..=self.ell_max {
            for m in -(ell as i32)..=(ell as i32) {
                let sign = if (self.spin + m) % 2 == 0 { 1. } else { -1. };
                out.data[swsh::lm_index(ell, m)] =
                    sign * self.data[swsh::lm_index(ell, -m)].conj();
            }
        }

        out
    }

    /// The spin-raising derivative, `edth: s -> s + 1`, acting as the
    /// multiplier `sqrt((l - s)(l + s + 1))` on each coefficient
    pub fn edth(&self) -> AngularModes {
        let s = self.spin;
        self.ladder(s + 1, |ell| ((ell - s as i64) * (ell + s as i64 + 1)) as f64, 1.)
    }

    /// The spin-lowering derivative, `edthbar: s -> s - 1`, acting as the
    /// multiplier `-sqrt((l + s)(l - s + 1))` on each coefficient
    pub fn edthbar(&self) -> AngularModes {
        let s = self.spin;
        self.ladder(s - 1, |ell| ((ell + s as i64) * (ell - s as i64 + 1)) as f64, -1.)
    }

    fn ladder(&self, spin_out: i32, factor: impl Fn(i64) -> f64, sign: f64) -> AngularModes {
        let mut out = AngularModes::zeros(spin_out, self.ell_max);

        for ell in 0..=self.ell_max {
            let f = factor(ell as i64);

            if f <= 0. {
                continue;
            }

            let multiplier = sign * f.sqrt();

            for m in -(ell as i32)..=(ell as i32) {
                out.data[swsh::lm_index(ell, m)] =
                    multiplier * self.data[swsh::lm_index(ell, m)];
            }
        }

        out
    }

    /// `edth^2 edthbar^2`, the fourth-order spin-0 operator entering the
    /// super-momentum balance; its eigenvalue on degree `l` is
    /// `(l - 1) l (l + 1)(l + 2)`
    pub fn edth2edthbar2(&self) -> AngularModes {
        self.edthbar().edthbar().edth().edth()
    }

    /// Evaluate the field at an arbitrary direction by direct synthesis,
    /// exact to truncation order
    pub fn evaluate_at_point(&self, theta: f64, phi: f64) -> Complex64 {
        let mut acc = Complex64::new(0., 0.);

        for ell in 0..=self.ell_max {
            for m in -(ell as i32)..=(ell as i32) {
                acc += self.data[swsh::lm_index(ell, m)]
                    * swsh::spin_harmonic(self.spin, ell, m, theta, phi);
            }
        }

        acc
    }

    /// Evaluate the field in the frame selected by a rotor, including the
    /// spin phase of the rotated tangent basis
    pub fn evaluate_at_rotor(&self, rotor: &UnitQuaternion<f64>) -> Complex64 {
        let (alpha, beta, gamma) = swsh::euler_angles(rotor);
        let spin_phase = Complex64::from_polar(1., -self.spin as f64 * gamma);

        let mut acc = Complex64::new(0., 0.);

        for ell in 0..=self.ell_max {
            for m in -(ell as i32)..=(ell as i32) {
                acc += self.data[swsh::lm_index(ell, m)]
                    * swsh::swsh_theta(self.spin, ell, m, beta)
                    * Complex64::from_polar(1., m as f64 * alpha);
            }
        }

        acc * spin_phase
    }

    /// Euclidean norm of the coefficient sequence
    pub fn norm(&self) -> f64 {
        self.data.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{UnitQuaternion, Vector3};
    use num_complex::Complex64;

    use crate::error::ScriError;

    use super::AngularModes;

    fn synthetic(spin: i32, ell_max: u32, seed: f64) -> AngularModes {
        let mut out = AngularModes::zeros(spin, ell_max);

        for ell in spin.unsigned_abs()..=ell_max {
            for m in -(ell as i32)..=(ell as i32) {
                let x = (seed + ell as f64 + 0.7 * m as f64).sin();
                let y = (seed * 1.3 - m as f64 + 0.1 * ell as f64).cos();
                out.set_coefficient(ell, m, Complex64::new(x, 0.4 * y)).unwrap();
            }
        }

        out
    }

    #[test]
    fn coefficient_count_is_enforced() {
        let data = vec![Complex64::new(0., 0.); 8].into_boxed_slice();
        assert!(matches!(
            AngularModes::new(0, 2, data),
            Err(ScriError::ShapeMismatch(..))
        ));
    }

    #[test]
    fn grid_round_trip_reproduces_coefficients() {
        for (spin, ell_max) in [(0, 3), (-2, 4), (1, 5)] {
            let a = synthetic(spin, ell_max, 0.3);
            let res = 2 * ell_max as usize + 1;

            let back = AngularModes::from_grid(&a.to_grid(res, res).unwrap(), ell_max).unwrap();

            assert_eq!(back.spin(), spin);
            for (x, y) in a.data().iter().zip(back.data().iter()) {
                assert!((x - y).norm() < 1e-11, "{x} vs {y} at spin {spin}");
            }
        }
    }

    #[test]
    fn undersized_grid_is_rejected() {
        let a = synthetic(0, 4, 0.1);
        assert!(matches!(a.to_grid(9, 5), Err(ScriError::ShapeMismatch(..))));

        let grid = a.to_grid(9, 9).unwrap();
        assert!(matches!(
            AngularModes::from_grid(&grid, 8),
            Err(ScriError::ShapeMismatch(..))
        ));
    }

    #[test]
    fn edth_is_linear() {
        let a = synthetic(-1, 4, 0.9);
        let b = synthetic(-1, 4, 2.2);

        let lhs = a.add(&b).unwrap().edth();
        let rhs = a.edth().add(&b.edth()).unwrap();

        assert_eq!(lhs.spin(), 0);
        for (x, y) in lhs.data().iter().zip(rhs.data().iter()) {
            assert!((x - y).norm() < 1e-13);
        }
    }

    #[test]
    fn edth_raises_and_edthbar_lowers_spin() {
        let a = synthetic(0, 3, 1.1);
        assert_eq!(a.edth().spin(), 1);
        assert_eq!(a.edthbar().spin(), -1);
        assert_eq!(a.edth().edthbar().spin(), 0);
    }

    #[test]
    fn edth2edthbar2_eigenvalue() {
        let mut a = AngularModes::zeros(0, 3);
        a.set_coefficient(2, 1, Complex64::new(1., -0.5)).unwrap();
        a.set_coefficient(3, -2, Complex64::new(0., 2.)).unwrap();

        let d = a.edth2edthbar2();
        assert_eq!(d.spin(), 0);

        // (l-1) l (l+1) (l+2): 24 at l = 2, 120 at l = 3
        assert!((d.coefficient(2, 1) - Complex64::new(24., -12.)).norm() < 1e-12);
        assert!((d.coefficient(3, -2) - Complex64::new(0., 240.)).norm() < 1e-12);
        assert!(d.coefficient(1, 0).norm() < 1e-15);
    }

    #[test]
    fn double_conjugation_is_identity() {
        for (spin, ell_max) in [(0, 3), (2, 4), (-1, 2)] {
            let a = synthetic(spin, ell_max, 0.5);
            let b = a.bar().bar();

            assert_eq!(b.spin(), spin);
            for (x, y) in a.data().iter().zip(b.data().iter()) {
                assert!((x - y).norm() < 1e-15);
            }
        }
    }

    #[test]
    fn conjugate_matches_pointwise_conjugation() {
        let a = synthetic(-2, 3, 0.8);
        let b = a.bar();

        for (theta, phi) in [(0.4, 0.9), (1.7, 3.3), (2.8, 5.9)] {
            let x = a.evaluate_at_point(theta, phi).conj();
            let y = b.evaluate_at_point(theta, phi);
            assert!((x - y).norm() < 1e-12);
        }
    }

    #[test]
    fn product_of_grids_divides_back() {
        let a = synthetic(1, 2, 0.2);
        // Dominant monopole keeps b bounded away from zero
        let mut b = synthetic(0, 2, 1.4).scale(0.1);
        b.set_coefficient(0, 0, Complex64::new(3., 0.)).unwrap();

        let product = a.mul(&b).unwrap();
        assert_eq!(product.spin(), 1);
        assert_eq!(product.ell_max(), 4);

        let quotient = product.div(&b).unwrap();
        assert_eq!(quotient.spin(), 1);

        for ell in 0..=2 {
            for m in -(ell as i32)..=(ell as i32) {
                let x = a.coefficient(ell, m);
                let y = quotient.coefficient(ell, m);
                assert!((x - y).norm() < 1e-8, "({ell},{m}): {x} vs {y}");
            }
        }
    }

    #[test]
    fn pow_matches_repeated_multiplication() {
        let a = synthetic(0, 2, 0.6);
        let squared = a.pow(2).unwrap();
        let product = a.mul(&a).unwrap();

        assert_eq!(squared.ell_max(), product.ell_max());
        for (x, y) in squared.data().iter().zip(product.data().iter()) {
            assert!((x - y).norm() < 1e-11);
        }
    }

    #[test]
    fn zeroth_power_is_the_unit_field() {
        let a = synthetic(2, 3, 0.7);
        let one = a.pow(0).unwrap();

        assert_eq!(one.spin(), 0);
        assert_eq!(one.ell_max(), 0);
        // Pointwise 1 has monopole coefficient sqrt(4 pi)
        let c = one.coefficient(0, 0);
        assert!((c.re - (4. * std::f64::consts::PI).sqrt()).abs() < 1e-12);
        assert!(c.im.abs() < 1e-13);
    }

    #[test]
    fn point_evaluation_matches_grid_samples() {
        let a = synthetic(-2, 3, 1.9);
        let grid = a.to_grid(9, 9).unwrap();

        for (j, k) in [(0usize, 0usize), (3, 2), (8, 8)] {
            let theta = j as f64 * std::f64::consts::PI / 8.;
            let phi = 2. * std::f64::consts::PI * k as f64 / 9.;
            let x = a.evaluate_at_point(theta, phi);
            let y = grid[j * 9 + k];
            assert!((x - y).norm() < 1e-12, "({j},{k}): {x} vs {y}");
        }
    }

    #[test]
    fn rotor_evaluation_reduces_to_point_evaluation() {
        let a = synthetic(2, 3, 0.4);

        for (theta, phi) in [(0.6, 1.0), (2.1, 4.4)] {
            let rotor = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), phi)
                * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), theta);

            let x = a.evaluate_at_point(theta, phi);
            let y = a.evaluate_at_rotor(&rotor);
            assert!((x - y).norm() < 1e-12, "{x} vs {y}");
        }
    }
}
