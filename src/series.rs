//! Time series of angular-mode fields, and their interpolation

use itertools::Itertools;

use crate::error::ScriError;
use crate::modes::AngularModes;

/// One waveform quantity as a strictly increasing time grid with an
/// [AngularModes] field per sample.
///
/// All samples share a single spin and are padded to a common maximum degree
/// on construction.
#[derive(Debug, Clone)]
pub struct ModeSeries {
    times: Box<[f64]>,
    data: Vec<AngularModes>,
    spin: i32,
    ell_max: u32,
}

/// Linear interpolation between two equally shaped mode objects
pub(crate) fn lerp_modes(a: &AngularModes, b: &AngularModes, w: f64) -> AngularModes {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.spin(), b.spin());

    let data = a
        .data()
        .iter()
        .zip(b.data().iter())
        .map(|(&x, &y)| x + w * (y - x))
        .collect();

    AngularModes::new(a.spin(), a.ell_max(), data)
        .expect("interpolants have the shape of their endpoints")
}

impl ModeSeries {
    /// Build a series from matching time and field sequences.
    ///
    /// Fails with [ScriError::TimeGridMismatch] when the lengths differ, the
    /// grid is empty or not strictly increasing, and with
    /// [ScriError::ShapeMismatch] when the samples disagree in spin.
    pub fn new(times: Box<[f64]>, data: Vec<AngularModes>) -> Result<ModeSeries, ScriError> {
        if times.len() != data.len() {
            return Err(ScriError::TimeGridMismatch(format!(
                "{} times against {} fields",
                times.len(),
                data.len()
            )));
        }

        if times.is_empty() {
            return Err(ScriError::TimeGridMismatch("empty time grid".to_string()));
        }

        if !times.iter().tuple_windows().all(|(a, b)| a < b) {
            return Err(ScriError::TimeGridMismatch(
                "time grid is not strictly increasing".to_string(),
            ));
        }

        let spin = data[0].spin();

        if let Some(bad) = data.iter().find(|modes| modes.spin() != spin) {
            return Err(ScriError::ShapeMismatch(
                "ModeSeries::new",
                format!("spin {} sample in a spin {spin} series", bad.spin()),
            ));
        }

        let ell_max = data.iter().map(AngularModes::ell_max).max().unwrap_or(0);
        let data = data.into_iter().map(|modes| modes.padded(ell_max)).collect();

        Ok(ModeSeries {
            times,
            data,
            spin,
            ell_max,
        })
    }

    /// Number of time samples
    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// The time grid
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Spin weight shared by every sample
    pub fn spin(&self) -> i32 {
        self.spin
    }

    /// Common maximum degree of the samples
    pub fn ell_max(&self) -> u32 {
        self.ell_max
    }

    /// Field at sample index `i`
    pub fn at(&self, i: usize) -> Result<&AngularModes, ScriError> {
        self.data
            .get(i)
            .ok_or(ScriError::IndexOutOfRange(i, self.times.len() - 1))
    }

    /// Field at an arbitrary time, linearly interpolated between the
    /// bracketing samples and clamped to the end values outside the grid
    pub fn sample(&self, t: f64) -> AngularModes {
        sample_series(&self.times, &self.data, t)
    }

    /// Resample onto a new strictly increasing time grid
    pub fn interpolate(&self, new_times: &[f64]) -> Result<ModeSeries, ScriError> {
        let data = new_times.iter().map(|&t| self.sample(t)).collect();

        ModeSeries::new(new_times.to_vec().into_boxed_slice(), data)
    }

    /// Time derivative of the series by centered finite differences
    /// (one-sided at the ends). Requires at least two samples.
    pub fn finite_difference(&self) -> Result<ModeSeries, ScriError> {
        let n = self.times.len();

        if n < 2 {
            return Err(ScriError::TimeGridMismatch(
                "finite differencing needs at least two samples".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(n);

        for i in 0..n {
            let (lo, hi) = if i == 0 {
                (0, 1)
            } else if i == n - 1 {
                (n - 2, n - 1)
            } else {
                (i - 1, i + 1)
            };

            let dt = self.times[hi] - self.times[lo];
            let diff = self.data[hi]
                .sub(&self.data[lo])
                .expect("samples of one series share a shape");

            data.push(diff.scale(1. / dt));
        }

        ModeSeries::new(self.times.clone(), data)
    }
}

/// Clamped linear interpolation over a shared time grid
pub(crate) fn sample_series(times: &[f64], data: &[AngularModes], t: f64) -> AngularModes {
    let n = times.len();

    if t <= times[0] {
        return data[0].clone();
    }

    if t >= times[n - 1] {
        return data[n - 1].clone();
    }

    let hi = times.partition_point(|&x| x <= t).min(n - 1);
    let lo = hi - 1;
    let w = (t - times[lo]) / (times[hi] - times[lo]);

    lerp_modes(&data[lo], &data[hi], w)
}

#[cfg(test)]
mod tests {
    use num_complex::Complex64;

    use crate::error::ScriError;
    use crate::modes::AngularModes;

    use super::ModeSeries;

    fn ramp(ell_max: u32, value: f64) -> AngularModes {
        let mut out = AngularModes::zeros(0, ell_max);
        out.set_coefficient(0, 0, Complex64::new(value, -value)).unwrap();
        out.set_coefficient(2, 1, Complex64::new(0.5 * value, 0.)).unwrap();
        out
    }

    #[test]
    fn non_monotonic_times_are_rejected() {
        let times = vec![0., 1., 1.].into_boxed_slice();
        let data = vec![ramp(2, 0.), ramp(2, 1.), ramp(2, 2.)];

        assert!(matches!(
            ModeSeries::new(times, data),
            Err(ScriError::TimeGridMismatch(_))
        ));
    }

    #[test]
    fn sampling_interpolates_and_clamps() {
        let times = vec![0., 1., 3.].into_boxed_slice();
        let data = vec![ramp(2, 0.), ramp(2, 1.), ramp(2, 3.)];
        let series = ModeSeries::new(times, data).unwrap();

        let mid = series.sample(2.);
        assert!((mid.coefficient(0, 0) - Complex64::new(2., -2.)).norm() < 1e-14);

        let before = series.sample(-5.);
        assert!(before.coefficient(0, 0).norm() < 1e-14);

        let after = series.sample(10.);
        assert!((after.coefficient(2, 1) - Complex64::new(1.5, 0.)).norm() < 1e-14);
    }

    #[test]
    fn finite_difference_of_linear_ramp_is_constant() {
        let times = vec![0., 0.5, 1.5, 2.].into_boxed_slice();
        let data = times.iter().map(|&t| ramp(2, 3. * t)).collect();
        let series = ModeSeries::new(times, data).unwrap();

        let dot = series.finite_difference().unwrap();

        for i in 0..dot.n_times() {
            let c = dot.at(i).unwrap().coefficient(0, 0);
            assert!((c - Complex64::new(3., -3.)).norm() < 1e-12, "sample {i}: {c}");
        }
    }

    #[test]
    fn single_sample_cannot_be_differenced() {
        let series = ModeSeries::new(vec![0.].into_boxed_slice(), vec![ramp(2, 1.)]).unwrap();
        assert!(matches!(
            series.finite_difference(),
            Err(ScriError::TimeGridMismatch(_))
        ));
    }

    #[test]
    fn interpolate_resamples_the_series() {
        let times = vec![0., 1., 2.].into_boxed_slice();
        let data = times.iter().map(|&t| ramp(2, t)).collect();
        let series = ModeSeries::new(times, data).unwrap();

        let fine = series.interpolate(&[0., 0.25, 0.5, 0.75, 1.]).unwrap();
        assert_eq!(fine.n_times(), 5);
        assert!((fine.sample(0.75).coefficient(0, 0).re - 0.75).abs() < 1e-14);
    }
}
