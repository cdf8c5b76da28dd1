//! One retarded-time snapshot of the asymptotic geometry

use std::f64::consts::PI;

use nalgebra::{Vector3, Vector4};
use num_complex::Complex64;

use crate::boost::{lattice_points, BoostVelocity};
use crate::error::ScriError;
use crate::grid::AngularGrid;
use crate::modes::{default_resolution, AngularModes};

/// The seven fields bundled on a slice, in their observable order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Curvature scalar psi0, spin 2
    Psi0,
    /// Curvature scalar psi1, spin 1
    Psi1,
    /// Curvature scalar psi2, spin 0
    Psi2,
    /// Curvature scalar psi3, spin -1
    Psi3,
    /// Curvature scalar psi4, spin -2
    Psi4,
    /// Shear of the outgoing null rays, spin 2
    Sigma,
    /// Retarded-time derivative of the shear, spin 2
    SigmaDot,
}

/// All fields in index order `psi0..psi4, sigma, sigmadot`
pub const FIELDS: [Field; 7] = [
    Field::Psi0,
    Field::Psi1,
    Field::Psi2,
    Field::Psi3,
    Field::Psi4,
    Field::Sigma,
    Field::SigmaDot,
];

impl Field {
    /// Spin weight the field must carry
    pub fn spin(&self) -> i32 {
        match self {
            Field::Psi0 => 2,
            Field::Psi1 => 1,
            Field::Psi2 => 0,
            Field::Psi3 => -1,
            Field::Psi4 => -2,
            Field::Sigma | Field::SigmaDot => 2,
        }
    }
}

/// Full asymptotic data at one instant of retarded time, in mode
/// representation.
///
/// A slice owns its seven fields outright; nothing is shared across slices.
#[derive(Debug, Clone)]
pub struct AsymptoticSlice {
    psi0: AngularModes,
    psi1: AngularModes,
    psi2: AngularModes,
    psi3: AngularModes,
    psi4: AngularModes,
    sigma: AngularModes,
    sigmadot: AngularModes,
}

impl AsymptoticSlice {
    /// Bundle seven fields, checking that each carries its required spin
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        psi0: AngularModes,
        psi1: AngularModes,
        psi2: AngularModes,
        psi3: AngularModes,
        psi4: AngularModes,
        sigma: AngularModes,
        sigmadot: AngularModes,
    ) -> Result<AsymptoticSlice, ScriError> {
        let slice = AsymptoticSlice {
            psi0,
            psi1,
            psi2,
            psi3,
            psi4,
            sigma,
            sigmadot,
        };

        for field in FIELDS {
            let got = slice.field(field).spin();

            if got != field.spin() {
                return Err(ScriError::ShapeMismatch(
                    "AsymptoticSlice::new",
                    format!("{field:?} has spin {got}, expected {}", field.spin()),
                ));
            }
        }

        Ok(slice)
    }

    /// The zero slice at a given degree
    pub fn zeros(ell_max: u32) -> AsymptoticSlice {
        AsymptoticSlice {
            psi0: AngularModes::zeros(2, ell_max),
            psi1: AngularModes::zeros(1, ell_max),
            psi2: AngularModes::zeros(0, ell_max),
            psi3: AngularModes::zeros(-1, ell_max),
            psi4: AngularModes::zeros(-2, ell_max),
            sigma: AngularModes::zeros(2, ell_max),
            sigmadot: AngularModes::zeros(2, ell_max),
        }
    }

    /// Access a field by name
    pub fn field(&self, field: Field) -> &AngularModes {
        match field {
            Field::Psi0 => &self.psi0,
            Field::Psi1 => &self.psi1,
            Field::Psi2 => &self.psi2,
            Field::Psi3 => &self.psi3,
            Field::Psi4 => &self.psi4,
            Field::Sigma => &self.sigma,
            Field::SigmaDot => &self.sigmadot,
        }
    }

    /// Access a field by its observable index, `0..=6` in the order
    /// `psi0..psi4, sigma, sigmadot`
    pub fn field_at(&self, i: usize) -> Result<&AngularModes, ScriError> {
        FIELDS
            .get(i)
            .map(|&field| self.field(field))
            .ok_or(ScriError::IndexOutOfRange(i, FIELDS.len() - 1))
    }

    /// Largest maximum degree across the seven fields
    pub fn ell_max(&self) -> u32 {
        FIELDS
            .iter()
            .map(|&field| self.field(field).ell_max())
            .max()
            .unwrap_or(0)
    }

    /// The Moreschi super-momentum aspect,
    /// `Psi = psi2 + sigma * conj(sigmadot) + edth^2 conj(sigma)`,
    /// a spin-0 complex field
    pub fn super_momentum(&self) -> Result<AngularModes, ScriError> {
        let flux = self.sigma.mul(&self.sigmadot.bar())?;
        let shear_curl = self.sigma.bar().edth().edth();

        self.psi2.add(&flux)?.add(&shear_curl)
    }

    /// Bondi mass, the real monopole of the super-momentum aspect
    pub fn mass(&self) -> Result<f64, ScriError> {
        Ok(four_momentum_from_aspect(&self.super_momentum()?)[0])
    }

    /// Bondi four-momentum from the `ell <= 1` moments of the super-momentum
    /// aspect, as `(p^t, p^x, p^y, p^z)`
    pub fn four_momentum(&self) -> Result<Vector4<f64>, ScriError> {
        Ok(four_momentum_from_aspect(&self.super_momentum()?))
    }

    /// Apply a boost and supertranslation to this slice, taken as the data at
    /// retarded time `u`.
    ///
    /// Only this slice is available, so the per-point retarded-time shifts are
    /// accounted for to first order through `sigmadot`; use
    /// [crate::history::AsymptoticHistory::bms_transformation] when the full
    /// time series is at hand.
    pub fn bms_transformation_on_slice(
        &self,
        u: f64,
        v: &BoostVelocity,
        delta: &AngularModes,
    ) -> Result<AsymptoticSliceGrid, ScriError> {
        let ell_max = self.ell_max().max(delta.ell_max());
        let res = default_resolution(ell_max);

        bms_transform_engine(u, v, delta, ell_max, res, res, &|field, t| {
            if field == Field::Sigma {
                // sigma(t) ~ sigma(u) + (t - u) sigmadot(u)
                let drift = self.sigmadot.scale(t - u);
                self.sigma
                    .add(&drift)
                    .expect("sigma and sigmadot share spin 2")
            } else {
                self.field(field).clone()
            }
        })
    }

    /// One local Moreschi refinement step from this slice alone.
    ///
    /// The mass dipole of the super-momentum updates the boost estimate and
    /// its `ell >= 2` part updates the supertranslation, both written back
    /// into the caller-supplied parameters.
    pub fn moreschi_iteration(
        &self,
        one_over_k: &mut AngularModes,
        delta: &mut AngularModes,
    ) -> Result<(), ScriError> {
        let psi = self.super_momentum()?;

        let p = four_momentum_from_aspect(&psi);
        let w = Vector3::new(p[1], p[2], p[3]) / p[0];

        let v = BoostVelocity::from_one_over_k(one_over_k)?.compose(&w)?;
        *one_over_k = v.one_over_k(one_over_k.ell_max())?;

        apply_supertranslation_update(delta, &psi)?;

        Ok(())
    }
}

/// Four-momentum encoded in the `ell <= 1` moments of a spin-0 mass aspect,
/// `p = -(1/4pi) * integral of Psi * (1, n)`
pub(crate) fn four_momentum_from_aspect(psi: &AngularModes) -> Vector4<f64> {
    let c00 = psi.coefficient(0, 0);
    let c10 = psi.coefficient(1, 0);
    let c1m1 = psi.coefficient(1, -1);
    let c11 = psi.coefficient(1, 1);

    let transverse = 0.25 * (2. / (3. * PI)).sqrt();

    Vector4::new(
        -c00.re / (2. * PI.sqrt()),
        -transverse * (c1m1 - c11).re,
        -transverse * (c11 + c1m1).im,
        -c10.re / (2. * (3. * PI).sqrt()),
    )
}

/// Add the `ell >= 2` part of a residual mass aspect to a supertranslation
/// estimate, weighted by the inverse of the `edth^2 edthbar^2` eigenvalue and
/// symmetrized so the estimate stays real-valued
pub(crate) fn apply_supertranslation_update(
    delta: &mut AngularModes,
    psi: &AngularModes,
) -> Result<(), ScriError> {
    let ell_max = delta.ell_max().max(psi.ell_max());
    let mut next = delta.padded(ell_max);

    for ell in 2..=ell_max {
        let lambda = ((ell as i64 - 1) * ell as i64 * (ell as i64 + 1) * (ell as i64 + 2)) as f64;

        for m in -(ell as i32)..=(ell as i32) {
            let a = psi.coefficient(ell, m);
            let b = psi.coefficient(ell, -m).conj();
            let sign = if m % 2 == 0 { 1. } else { -1. };

            let update = 0.5 * (a + sign * b) / lambda;
            let current = next.coefficient(ell, m);
            next.set_coefficient(ell, m, current + update)?;
        }
    }

    *delta = next;
    Ok(())
}

/// A slice in grid representation, the natural output of the pointwise BMS
/// transformation
#[derive(Debug, Clone)]
pub struct AsymptoticSliceGrid {
    /// psi0, spin 2
    pub psi0: AngularGrid,
    /// psi1, spin 1
    pub psi1: AngularGrid,
    /// psi2, spin 0
    pub psi2: AngularGrid,
    /// psi3, spin -1
    pub psi3: AngularGrid,
    /// psi4, spin -2
    pub psi4: AngularGrid,
    /// shear, spin 2
    pub sigma: AngularGrid,
    /// shear time derivative, spin 2
    pub sigmadot: AngularGrid,
}

impl AsymptoticSliceGrid {
    /// Access a field by its observable index, `0..=6`
    pub fn field_at(&self, i: usize) -> Result<&AngularGrid, ScriError> {
        match i {
            0 => Ok(&self.psi0),
            1 => Ok(&self.psi1),
            2 => Ok(&self.psi2),
            3 => Ok(&self.psi3),
            4 => Ok(&self.psi4),
            5 => Ok(&self.sigma),
            6 => Ok(&self.sigmadot),
            _ => Err(ScriError::IndexOutOfRange(i, 6)),
        }
    }

    /// Analyze every field back into mode representation at `ell_max`
    pub fn to_modes(&self, ell_max: u32) -> Result<AsymptoticSlice, ScriError> {
        AsymptoticSlice::new(
            AngularModes::from_grid(&self.psi0, ell_max)?,
            AngularModes::from_grid(&self.psi1, ell_max)?,
            AngularModes::from_grid(&self.psi2, ell_max)?,
            AngularModes::from_grid(&self.psi3, ell_max)?,
            AngularModes::from_grid(&self.psi4, ell_max)?,
            AngularModes::from_grid(&self.sigma, ell_max)?,
            AngularModes::from_grid(&self.sigmadot, ell_max)?,
        )
    }
}

/// Pointwise BMS transformation of the seven fields onto the cut `u' = u0`.
///
/// `sample` supplies each field's source-frame modes at an arbitrary retarded
/// time. Per output lattice point the engine aberrates the direction,
/// evaluates the time-shifted fields at the transported frame rotor, and
/// applies the conformal weights together with the `edth(shift)` mixing terms
/// of the standard transformation law.
pub(crate) fn bms_transform_engine(
    u0: f64,
    v: &BoostVelocity,
    delta: &AngularModes,
    ell_max: u32,
    n_theta: usize,
    n_phi: usize,
    sample: &dyn Fn(Field, f64) -> AngularModes,
) -> Result<AsymptoticSliceGrid, ScriError> {
    if delta.spin() != 0 {
        return Err(ScriError::ShapeMismatch(
            "bms_transform_engine",
            format!("supertranslation has spin {}, expected 0", delta.spin()),
        ));
    }

    let points = lattice_points(n_theta, n_phi);
    let n_points = points.len();

    // Per-point geometry: conformal factor at the aberrated source direction
    // (the reciprocal of the Doppler redshift seen at the output direction),
    // frame rotor, and local retarded-time shift.
    let mut conformal_k = vec![0.; n_points];
    let mut rotors = Vec::with_capacity(n_points);
    let mut shifts = vec![0.; n_points];

    for (i, &(theta, phi)) in points.iter().enumerate() {
        let n = BoostVelocity::direction(theta, phi);
        let rotor = v.frame_rotor(theta, phi);

        conformal_k[i] = 1. / v.inverse_conformal_factor_boosted(&n);
        shifts[i] = u0 * (conformal_k[i] - 1.) + delta.evaluate_at_rotor(&rotor).re;
        rotors.push(rotor);
    }

    // The angle-dependent shift feeds the mixing terms through its edth
    // derivatives, so it is analyzed once at the working band limit.
    let shift_samples: Box<[Complex64]> =
        shifts.iter().map(|&x| Complex64::new(x, 0.)).collect();
    let shift_grid = AngularGrid::new(0, n_theta, n_phi, shift_samples)?;
    let shift_modes = AngularModes::from_grid(&shift_grid, ell_max)?;

    let edth_shift = shift_modes.edth().to_grid(n_theta, n_phi)?;
    let edth2_shift = shift_modes.edth().edth().to_grid(n_theta, n_phi)?;

    let mut out: [Vec<Complex64>; 7] =
        std::array::from_fn(|_| vec![Complex64::new(0., 0.); n_points]);

    for i in 0..n_points {
        let u_src = u0 + shifts[i];
        let rotor = &rotors[i];

        let value = |field: Field| sample(field, u_src).evaluate_at_rotor(rotor);

        let psi0 = value(Field::Psi0);
        let psi1 = value(Field::Psi1);
        let psi2 = value(Field::Psi2);
        let psi3 = value(Field::Psi3);
        let psi4 = value(Field::Psi4);
        let sigma = value(Field::Sigma);
        let sigmadot = value(Field::SigmaDot);

        let k = conformal_k[i];
        let k3 = k * k * k;
        let es = edth_shift[i];
        let es2 = es * es;
        let es3 = es2 * es;
        let es4 = es2 * es2;

        out[0][i] = k3
            * (psi0 - 4. * es * psi1 + 6. * es2 * psi2 - 4. * es3 * psi3 + es4 * psi4);
        out[1][i] = k3 * (psi1 - 3. * es * psi2 + 3. * es2 * psi3 - es3 * psi4);
        out[2][i] = k3 * (psi2 - 2. * es * psi3 + es2 * psi4);
        out[3][i] = k3 * (psi3 - es * psi4);
        out[4][i] = k3 * psi4;
        out[5][i] = k * (sigma - edth2_shift[i]);
        out[6][i] = k * k * sigmadot;
    }

    let [d0, d1, d2, d3, d4, d5, d6] = out;

    Ok(AsymptoticSliceGrid {
        psi0: AngularGrid::new(2, n_theta, n_phi, d0.into_boxed_slice())?,
        psi1: AngularGrid::new(1, n_theta, n_phi, d1.into_boxed_slice())?,
        psi2: AngularGrid::new(0, n_theta, n_phi, d2.into_boxed_slice())?,
        psi3: AngularGrid::new(-1, n_theta, n_phi, d3.into_boxed_slice())?,
        psi4: AngularGrid::new(-2, n_theta, n_phi, d4.into_boxed_slice())?,
        sigma: AngularGrid::new(2, n_theta, n_phi, d5.into_boxed_slice())?,
        sigmadot: AngularGrid::new(2, n_theta, n_phi, d6.into_boxed_slice())?,
    })
}
