//! Spin-weighted spherical-harmonic transform layer.
//!
//! Everything here works on the equiangular lattice used by
//! [crate::grid::AngularGrid]: `n_theta` colatitudes `theta_j = j*pi/(n_theta-1)`
//! including both poles, and `n_phi` azimuths `phi_k = 2*pi*k/n_phi`. The
//! azimuthal reduction is a plain DFT (rustfft); the colatitude integral uses
//! Clenshaw-Curtis weights, which are exact for the polynomial degrees that
//! arise from products of same-spin harmonics up to the band limit. The
//! explicit-sum Wigner-d evaluation is adequate for the band limits used here
//! (ell_max up to a few tens).

use std::f64::consts::PI;

use num_complex::Complex64;
use rustfft::FftPlanner;

/// Colatitude of row `j` on an `n_theta`-row lattice including the poles
pub(crate) fn theta_node(j: usize, n_theta: usize) -> f64 {
    j as f64 * PI / (n_theta - 1) as f64
}

/// Azimuth of column `k` on an `n_phi`-column lattice
pub(crate) fn phi_node(k: usize, n_phi: usize) -> f64 {
    2. * PI * k as f64 / n_phi as f64
}

/// Flat index of the canonical dense mode layout `(0,0), (1,-1), (1,0), ...`
pub(crate) fn lm_index(ell: u32, m: i32) -> usize {
    (ell as i64 * ell as i64 + ell as i64 + m as i64) as usize
}

fn factorial(n: i64) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

/// Wigner small-d matrix element `d^l_{mp,m}(beta)` by the explicit sum formula
pub(crate) fn wigner_d(ell: i64, mp: i64, m: i64, beta: f64) -> f64 {
    if mp.abs() > ell || m.abs() > ell {
        return 0.;
    }

    let cos_half = (0.5 * beta).cos();
    let sin_half = (0.5 * beta).sin();

    let prefactor = (factorial(ell + mp)
        * factorial(ell - mp)
        * factorial(ell + m)
        * factorial(ell - m))
    .sqrt();

    let k_min = 0.max(m - mp);
    let k_max = (ell + m).min(ell - mp);

    let mut sum = 0.;

    for k in k_min..=k_max {
        let sign = if (mp - m + k) % 2 == 0 { 1. } else { -1. };
        let denom = factorial(ell + m - k)
            * factorial(k)
            * factorial(ell - k - mp)
            * factorial(mp - m + k);

        sum += sign * cos_half.powi((2 * ell + m - mp - 2 * k) as i32)
            * sin_half.powi((mp - m + 2 * k) as i32)
            / denom;
    }

    prefactor * sum
}

/// Colatitude part of the spin-weighted harmonic,
/// `sYlm(theta, phi) = swsh_theta(s, l, m, theta) * exp(i m phi)`
pub(crate) fn swsh_theta(s: i32, ell: u32, m: i32, theta: f64) -> f64 {
    let sign = if s % 2 == 0 { 1. } else { -1. };

    sign * ((2 * ell + 1) as f64 / (4. * PI)).sqrt()
        * wigner_d(ell as i64, m as i64, -s as i64, theta)
}

/// Spin-weighted spherical harmonic `sYlm` at a single direction
pub(crate) fn spin_harmonic(s: i32, ell: u32, m: i32, theta: f64, phi: f64) -> Complex64 {
    swsh_theta(s, ell, m, theta) * Complex64::from_polar(1., m as f64 * phi)
}

/// ZYZ Euler angles `(alpha, beta, gamma)` of a unit quaternion
/// `R = R_z(alpha) R_y(beta) R_z(gamma)`
pub(crate) fn euler_angles(rotor: &nalgebra::UnitQuaternion<f64>) -> (f64, f64, f64) {
    let q = rotor.quaternion();
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);

    let a = z.atan2(w);
    let b = (-x).atan2(y);

    (
        a + b,
        2. * (x * x + y * y).sqrt().atan2((w * w + z * z).sqrt()),
        a - b,
    )
}

/// Clenshaw-Curtis weights for the nodes `cos(theta_j)`, `theta_j = j*pi/(n-1)`.
///
/// Integrates `int_{-1}^{1} f(x) dx` exactly for polynomials of degree `< n`.
pub(crate) fn clenshaw_curtis_weights(n_theta: usize) -> Vec<f64> {
    let n = n_theta - 1;
    let half = n / 2;
    let mut weights = vec![0.; n_theta];

    for (j, w) in weights.iter_mut().enumerate() {
        let theta = theta_node(j, n_theta);
        let mut sum = 0.;

        for k in 1..=half {
            let b = if 2 * k == n { 1. } else { 2. };
            sum += b * (2. * k as f64 * theta).cos() / ((4 * k * k - 1) as f64);
        }

        let edge = if j == 0 || j == n { 0.5 } else { 1. };
        *w = edge * 2. / n as f64 * (1. - sum);
    }

    weights
}

/// Forward transform: equiangular samples of a spin-`s` field to dense mode
/// coefficients up to `ell_max`.
///
/// The caller must guarantee `n_theta >= 2*ell_max + 1` (and `>= 2`) and
/// `n_phi >= 2*ell_max + 1` so that the quadrature is exact for bandlimited
/// input; see [crate::modes::AngularModes::from_grid] for the guarded surface.
pub(crate) fn grid_to_modes(
    s: i32,
    n_theta: usize,
    n_phi: usize,
    samples: &[Complex64],
    ell_max: u32,
) -> Vec<Complex64> {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_phi);

    let mut rows = samples.to_vec();

    for row in rows.chunks_exact_mut(n_phi) {
        fft.process(row);
    }

    let weights = clenshaw_curtis_weights(n_theta);
    let phi_norm = 2. * PI / n_phi as f64;

    let mut coeffs = vec![Complex64::new(0., 0.); (ell_max as usize + 1) * (ell_max as usize + 1)];

    for ell in 0..=ell_max {
        for m in -(ell as i32)..=(ell as i32) {
            let bin = if m >= 0 {
                m as usize
            } else {
                (n_phi as i64 + m as i64) as usize
            };

            let mut acc = Complex64::new(0., 0.);

            for j in 0..n_theta {
                acc += weights[j] * swsh_theta(s, ell, m, theta_node(j, n_theta))
                    * rows[j * n_phi + bin];
            }

            coeffs[lm_index(ell, m)] = phi_norm * acc;
        }
    }

    coeffs
}

/// Inverse transform: dense mode coefficients to equiangular samples
pub(crate) fn modes_to_grid(
    s: i32,
    ell_max: u32,
    coeffs: &[Complex64],
    n_theta: usize,
    n_phi: usize,
) -> Vec<Complex64> {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_inverse(n_phi);

    let mut samples = vec![Complex64::new(0., 0.); n_theta * n_phi];

    for (j, row) in samples.chunks_exact_mut(n_phi).enumerate() {
        let theta = theta_node(j, n_theta);

        for m in -(ell_max as i32)..=(ell_max as i32) {
            let bin = if m >= 0 {
                m as usize
            } else {
                (n_phi as i64 + m as i64) as usize
            };

            let mut acc = Complex64::new(0., 0.);

            for ell in m.unsigned_abs().max(0)..=ell_max {
                acc += swsh_theta(s, ell, m, theta) * coeffs[lm_index(ell, m)];
            }

            row[bin] = acc;
        }

        // The spectrum is built directly, so the unnormalized inverse DFT is
        // exactly the synthesis sum over m.
        fft.process(row);
    }

    samples
}
