//! BMS boost geometry: conformal factors, aberration and frame rotors

use std::f64::consts::PI;

use nalgebra::{UnitQuaternion, Vector3};

use crate::error::ScriError;
use crate::grid::AngularGrid;
use crate::modes::{default_resolution, AngularModes};
use crate::swsh;

/// A physical boost velocity, `|v| < 1` in units of the speed of light.
///
/// Every boost-dependent geometric quantity on the sphere (conformal factor,
/// aberration map, tangent-frame rotor) is derived from this single
/// three-vector, which keeps the `OneOverK` angular function tied to a
/// realizable Lorentz transformation.
#[derive(Debug, Clone, Copy)]
pub struct BoostVelocity(Vector3<f64>);

impl BoostVelocity {
    /// Validate and wrap a velocity vector. `|v| >= 1` is
    /// [ScriError::DegenerateBoost].
    pub fn new(v: Vector3<f64>) -> Result<BoostVelocity, ScriError> {
        if !v.norm().is_finite() || v.norm() >= 1. {
            return Err(ScriError::DegenerateBoost(v.norm()));
        }

        Ok(BoostVelocity(v))
    }

    /// The rest frame
    pub fn zero() -> BoostVelocity {
        BoostVelocity(Vector3::zeros())
    }

    /// The wrapped velocity vector
    pub fn as_vector(&self) -> &Vector3<f64> {
        &self.0
    }

    /// Lorentz factor `1 / sqrt(1 - v^2)`
    pub fn gamma(&self) -> f64 {
        1. / (1. - self.0.norm_squared()).sqrt()
    }

    /// Unit direction of the lattice point `(theta, phi)`
    pub fn direction(theta: f64, phi: f64) -> Vector3<f64> {
        Vector3::new(
            theta.sin() * phi.cos(),
            theta.sin() * phi.sin(),
            theta.cos(),
        )
    }

    /// Doppler/aberration factor `K(v, n) = gamma * (1 - v.n)`
    pub fn conformal_factor(&self, n: &Vector3<f64>) -> f64 {
        self.gamma() * (1. - self.0.dot(n))
    }

    /// `1/K` evaluated at the source-frame direction of the new-frame
    /// direction `n`, which reduces to the closed form `gamma * (1 + v.n)`
    pub fn inverse_conformal_factor_boosted(&self, n: &Vector3<f64>) -> f64 {
        self.gamma() * (1. + self.0.dot(n))
    }

    /// Source-frame direction of a null ray seen along `n` in the boosted
    /// frame (special-relativistic aberration)
    pub fn source_direction(&self, n: &Vector3<f64>) -> Vector3<f64> {
        let beta = self.0.norm();

        if beta == 0. {
            return *n;
        }

        let axis = self.0 / beta;
        let parallel = n.dot(&axis);
        let perp = n - parallel * axis;
        let denom = 1. + beta * parallel;

        ((parallel + beta) / denom) * axis + perp / (self.gamma() * denom)
    }

    /// Rotor carrying the pole `z` to the source-frame direction of the
    /// lattice point `(theta, phi)`, transporting the tangent frame along the
    /// great circle from the new-frame direction.
    ///
    /// Evaluating a spin-weighted field at this rotor yields the value with
    /// the spin phase appropriate to the boosted observer.
    pub fn frame_rotor(&self, theta: f64, phi: f64) -> UnitQuaternion<f64> {
        let point = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), phi)
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), theta);

        let n = BoostVelocity::direction(theta, phi);
        let n_src = self.source_direction(&n);

        // For |v| < 1 aberration never reaches the antipode, so the minimal
        // rotation is well defined.
        let transport =
            UnitQuaternion::rotation_between(&n, &n_src).unwrap_or_else(UnitQuaternion::identity);

        transport * point
    }

    /// Relativistic composition `v (+) w` of this boost with a further small
    /// boost `w` expressed in the current frame
    pub fn compose(&self, w: &Vector3<f64>) -> Result<BoostVelocity, ScriError> {
        let v = self.0;
        let g = self.gamma();
        let denom = 1. + v.dot(w);

        BoostVelocity::new((v + w / g + (g / (1. + g)) * v.dot(w) * v) / denom)
    }

    /// The `OneOverK` angular function `1/K(v, n)` as spin-0 modes truncated
    /// at `ell_max`.
    ///
    /// `1/K` is not bandlimited for `v != 0`; the truncation error falls off
    /// as `|v|^(ell_max + 1)`.
    pub fn one_over_k(&self, ell_max: u32) -> Result<AngularModes, ScriError> {
        let res = default_resolution(ell_max);
        let grid = crate::grid::inverse_conformal_factor_grid(self, res, res)?;

        AngularModes::from_grid(&grid, ell_max)
    }

    /// Recover the boost velocity encoded by a `OneOverK` function.
    ///
    /// `K` itself is exactly degree one in the direction, so the velocity is
    /// read off the monopole and dipole of the pointwise reciprocal. Fails
    /// with [ScriError::DegenerateBoost] when no `|v| < 1` boost matches.
    pub fn from_one_over_k(one_over_k: &AngularModes) -> Result<BoostVelocity, ScriError> {
        if one_over_k.spin() != 0 {
            return Err(ScriError::ShapeMismatch(
                "BoostVelocity::from_one_over_k",
                format!("spin {} instead of 0", one_over_k.spin()),
            ));
        }

        let res = default_resolution(one_over_k.ell_max().max(1));
        let grid = one_over_k.to_grid(res, res)?;

        let mut k_samples = Vec::with_capacity(grid.len());

        for i in 0..grid.len() {
            let x = grid[i];

            if x.norm() < f64::EPSILON {
                return Err(ScriError::DegenerateBoost(f64::INFINITY));
            }

            k_samples.push(1. / x);
        }

        let k_grid = AngularGrid::new(0, grid.n_theta(), grid.n_phi(), k_samples.into_boxed_slice())?;
        let k_modes = AngularModes::from_grid(&k_grid, 1)?;

        let sqrt_4pi = (4. * PI).sqrt();
        let gamma = k_modes.coefficient(0, 0).re / sqrt_4pi;

        if gamma < 1. - 1e-8 {
            return Err(ScriError::DegenerateBoost((1. - 1. / (gamma * gamma)).sqrt()));
        }

        let c10 = k_modes.coefficient(1, 0);
        let c1m1 = k_modes.coefficient(1, -1);

        let vz = -c10.re / (2. * (PI / 3.).sqrt() * gamma);
        let vxy = -c1m1 / ((2. * PI / 3.).sqrt() * gamma);

        BoostVelocity::new(Vector3::new(vxy.re, vxy.im, vz))
    }
}

/// Convenience for `(theta, phi)` of every lattice point, row-major
pub(crate) fn lattice_points(n_theta: usize, n_phi: usize) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(n_theta * n_phi);

    for j in 0..n_theta {
        for k in 0..n_phi {
            points.push((swsh::theta_node(j, n_theta), swsh::phi_node(k, n_phi)));
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use crate::error::ScriError;

    use super::BoostVelocity;

    #[test]
    fn superluminal_velocity_is_degenerate() {
        assert!(matches!(
            BoostVelocity::new(Vector3::new(0.8, 0.8, 0.)),
            Err(ScriError::DegenerateBoost(_))
        ));
        assert!(BoostVelocity::new(Vector3::new(0.8, 0., 0.)).is_ok());
    }

    #[test]
    fn aberration_preserves_unit_directions() {
        let v = BoostVelocity::new(Vector3::new(0.1, -0.2, 0.3)).unwrap();

        for (theta, phi) in [(0.3, 1.2), (1.6, 4.0), (2.9, 0.1)] {
            let n = BoostVelocity::direction(theta, phi);
            let n_src = v.source_direction(&n);
            assert!((n_src.norm() - 1.).abs() < 1e-14);
        }
    }

    #[test]
    fn aberration_at_rest_is_identity() {
        let v = BoostVelocity::zero();
        let n = BoostVelocity::direction(0.7, 2.1);
        assert!((v.source_direction(&n) - n).norm() < 1e-15);
    }

    #[test]
    fn doppler_identity_links_both_frames() {
        // gamma(1 - v.n_src) * gamma(1 + v.n_new) = 1
        let v = BoostVelocity::new(Vector3::new(0., 0.25, -0.1)).unwrap();

        for (theta, phi) in [(0.5, 0.3), (1.2, 2.2), (2.4, 5.5)] {
            let n = BoostVelocity::direction(theta, phi);
            let n_src = v.source_direction(&n);

            let product = v.conformal_factor(&n_src) * v.inverse_conformal_factor_boosted(&n);
            assert!((product - 1.).abs() < 1e-13, "product {product}");
        }
    }

    #[test]
    fn one_over_k_round_trip() {
        let v = BoostVelocity::new(Vector3::new(0.05, -0.02, 0.08)).unwrap();
        let modes = v.one_over_k(8).unwrap();
        let recovered = BoostVelocity::from_one_over_k(&modes).unwrap();

        assert!(
            (recovered.as_vector() - v.as_vector()).norm() < 1e-6,
            "recovered {:?}",
            recovered.as_vector()
        );
    }

    #[test]
    fn composition_with_rest_is_identity() {
        let v = BoostVelocity::new(Vector3::new(0.3, 0., -0.1)).unwrap();
        let composed = v.compose(&Vector3::zeros()).unwrap();
        assert!((composed.as_vector() - v.as_vector()).norm() < 1e-15);

        let from_rest = BoostVelocity::zero()
            .compose(&Vector3::new(0.2, 0.1, 0.))
            .unwrap();
        assert!((from_rest.as_vector() - Vector3::new(0.2, 0.1, 0.)).norm() < 1e-15);
    }
}
