//! The asymptotic fields over a full span of retarded time

use crate::boost::BoostVelocity;
use crate::error::ScriError;
use crate::modes::{default_resolution, AngularModes};
use crate::series::ModeSeries;
use crate::slice::{bms_transform_engine, AsymptoticSlice, AsymptoticSliceGrid, Field};

/// The five curvature scalars and the shear over a common retarded-time grid.
///
/// The shear derivative is not taken as input; it is formed once by finite
/// differencing the shear series so that the seven per-slice fields stay
/// mutually consistent.
#[derive(Debug, Clone)]
pub struct AsymptoticHistory {
    psi0: ModeSeries,
    psi1: ModeSeries,
    psi2: ModeSeries,
    psi3: ModeSeries,
    psi4: ModeSeries,
    sigma: ModeSeries,
    sigmadot: ModeSeries,
}

impl AsymptoticHistory {
    /// Assemble a history from the six independent field series.
    ///
    /// All series must share one time grid exactly
    /// ([ScriError::TimeGridMismatch] otherwise) and carry the spins
    /// `2, 1, 0, -1, -2, 2` ([ScriError::ShapeMismatch]).
    pub fn new(
        psi0: ModeSeries,
        psi1: ModeSeries,
        psi2: ModeSeries,
        psi3: ModeSeries,
        psi4: ModeSeries,
        sigma: ModeSeries,
    ) -> Result<AsymptoticHistory, ScriError> {
        let named = [
            (Field::Psi0, &psi0),
            (Field::Psi1, &psi1),
            (Field::Psi2, &psi2),
            (Field::Psi3, &psi3),
            (Field::Psi4, &psi4),
            (Field::Sigma, &sigma),
        ];

        for (field, series) in named {
            if series.spin() != field.spin() {
                return Err(ScriError::ShapeMismatch(
                    "AsymptoticHistory::new",
                    format!(
                        "{field:?} series has spin {}, expected {}",
                        series.spin(),
                        field.spin()
                    ),
                ));
            }
        }

        if let Some((name, series)) = named
            .iter()
            .find(|(_, series)| series.times() != psi0.times())
        {
            return Err(ScriError::TimeGridMismatch(format!(
                "{name:?} series ({} samples) does not share the common time grid",
                series.n_times()
            )));
        }

        let sigmadot = sigma.finite_difference()?;

        Ok(AsymptoticHistory {
            psi0,
            psi1,
            psi2,
            psi3,
            psi4,
            sigma,
            sigmadot,
        })
    }

    /// Number of retarded-time samples
    pub fn n_times(&self) -> usize {
        self.psi0.n_times()
    }

    /// The shared time grid
    pub fn times(&self) -> &[f64] {
        self.psi0.times()
    }

    /// Largest maximum degree across the stored series
    pub fn ell_max(&self) -> u32 {
        [
            &self.psi0,
            &self.psi1,
            &self.psi2,
            &self.psi3,
            &self.psi4,
            &self.sigma,
        ]
        .iter()
        .map(|series| series.ell_max())
        .max()
        .unwrap_or(0)
    }

    /// Series for one field (the shear derivative included)
    pub fn field(&self, field: Field) -> &ModeSeries {
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

    /// Full field bundle at sample index `i`
    pub fn slice_at(&self, i: usize) -> Result<AsymptoticSlice, ScriError> {
        AsymptoticSlice::new(
            self.psi0.at(i)?.clone(),
            self.psi1.at(i)?.clone(),
            self.psi2.at(i)?.clone(),
            self.psi3.at(i)?.clone(),
            self.psi4.at(i)?.clone(),
            self.sigma.at(i)?.clone(),
            self.sigmadot.at(i)?.clone(),
        )
    }

    /// One field at an arbitrary retarded time, interpolated within the grid
    /// and clamped outside it
    pub fn sample_field(&self, field: Field, t: f64) -> AngularModes {
        self.field(field).sample(t)
    }

    /// Transform the data to the frame of a boosted, supertranslated observer
    /// and extract the cut `u' = u0` as a grid-valued slice.
    ///
    /// Each output lattice point reads the source fields at its own retarded
    /// time, interpolated from the stored series, so the output cut weaves
    /// through the input time grid.
    pub fn bms_transformation(
        &self,
        u0: f64,
        v: &BoostVelocity,
        delta: &AngularModes,
    ) -> Result<AsymptoticSliceGrid, ScriError> {
        let ell_max = self.ell_max().max(delta.ell_max());
        let res = default_resolution(ell_max);

        self.bms_transformation_at_resolution(u0, v, delta, ell_max, res, res)
    }

    /// [AsymptoticHistory::bms_transformation] with explicit band limit and
    /// lattice shape
    pub fn bms_transformation_at_resolution(
        &self,
        u0: f64,
        v: &BoostVelocity,
        delta: &AngularModes,
        ell_max: u32,
        n_theta: usize,
        n_phi: usize,
    ) -> Result<AsymptoticSliceGrid, ScriError> {
        bms_transform_engine(u0, v, delta, ell_max, n_theta, n_phi, &|field, t| {
            self.sample_field(field, t)
        })
    }
}

#[cfg(test)]
mod tests {
    use num_complex::Complex64;

    use crate::boost::BoostVelocity;
    use crate::error::ScriError;
    use crate::modes::AngularModes;
    use crate::series::ModeSeries;
    use crate::slice::Field;

    use super::AsymptoticHistory;

    fn constant_series(spin: i32, ell_max: u32, times: &[f64], value: Complex64) -> ModeSeries {
        let data = times
            .iter()
            .map(|_| {
                let mut modes = AngularModes::zeros(spin, ell_max);
                let ell = spin.unsigned_abs().max(2);
                modes.set_coefficient(ell, 0, value).unwrap();
                modes
            })
            .collect();

        ModeSeries::new(times.to_vec().into_boxed_slice(), data).unwrap()
    }

    fn test_history(times: &[f64]) -> AsymptoticHistory {
        AsymptoticHistory::new(
            constant_series(2, 3, times, Complex64::new(0.1, 0.)),
            constant_series(1, 3, times, Complex64::new(0., 0.2)),
            constant_series(0, 3, times, Complex64::new(-0.5, 0.)),
            constant_series(-1, 3, times, Complex64::new(0.05, 0.05)),
            constant_series(-2, 3, times, Complex64::new(0.3, -0.1)),
            constant_series(2, 3, times, Complex64::new(0.2, 0.4)),
        )
        .unwrap()
    }

    #[test]
    fn mismatched_time_grids_are_rejected() {
        let times = [0., 1., 2.];
        let other = [0., 1., 2.5];

        let result = AsymptoticHistory::new(
            constant_series(2, 3, &times, Complex64::new(0.1, 0.)),
            constant_series(1, 3, &times, Complex64::new(0., 0.2)),
            constant_series(0, 3, &other, Complex64::new(-0.5, 0.)),
            constant_series(-1, 3, &times, Complex64::new(0.05, 0.05)),
            constant_series(-2, 3, &times, Complex64::new(0.3, -0.1)),
            constant_series(2, 3, &times, Complex64::new(0.2, 0.4)),
        );

        assert!(matches!(result, Err(ScriError::TimeGridMismatch(_))));
    }

    #[test]
    fn wrong_spin_series_is_rejected() {
        let times = [0., 1., 2.];

        let result = AsymptoticHistory::new(
            constant_series(2, 3, &times, Complex64::new(0.1, 0.)),
            constant_series(2, 3, &times, Complex64::new(0., 0.2)),
            constant_series(0, 3, &times, Complex64::new(-0.5, 0.)),
            constant_series(-1, 3, &times, Complex64::new(0.05, 0.05)),
            constant_series(-2, 3, &times, Complex64::new(0.3, -0.1)),
            constant_series(2, 3, &times, Complex64::new(0.2, 0.4)),
        );

        assert!(matches!(result, Err(ScriError::ShapeMismatch(..))));
    }

    #[test]
    fn shear_derivative_of_static_data_vanishes() {
        let history = test_history(&[0., 1., 2., 3.]);
        let sigmadot = history.field(Field::SigmaDot);

        for i in 0..sigmadot.n_times() {
            assert!(sigmadot.at(i).unwrap().norm() < 1e-13);
        }
    }

    #[test]
    fn slice_extraction_matches_the_series() {
        let history = test_history(&[0., 0.5, 1.]);
        let slice = history.slice_at(1).unwrap();

        assert!(
            (slice.field(Field::Psi2).coefficient(2, 0) - Complex64::new(-0.5, 0.)).norm() < 1e-14
        );
        assert!(matches!(
            history.slice_at(3),
            Err(ScriError::IndexOutOfRange(3, 2))
        ));
    }

    #[test]
    fn identity_transformation_returns_the_cut_unchanged() {
        let history = test_history(&[-1., 0., 1.]);
        let delta = AngularModes::zeros(0, 3);

        let grid_slice = history
            .bms_transformation(0.25, &BoostVelocity::zero(), &delta)
            .unwrap();
        let back = grid_slice.to_modes(3).unwrap();

        for field in [Field::Psi0, Field::Psi2, Field::Psi4, Field::Sigma] {
            let expected = history.sample_field(field, 0.25);
            let got = back.field(field);

            for ell in 0..=3u32 {
                for m in -(ell as i32)..=(ell as i32) {
                    let diff = (expected.coefficient(ell, m) - got.coefficient(ell, m)).norm();
                    assert!(diff < 1e-10, "{field:?} ({ell},{m}): {diff}");
                }
            }
        }
    }
}
