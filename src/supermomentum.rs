//! Super-momentum histories and the Moreschi fixed-point solver

use nalgebra::Vector3;

use crate::boost::{lattice_points, BoostVelocity};
use crate::error::{MoreschiEstimate, ScriError};
use crate::grid::AngularGrid;
use crate::history::AsymptoticHistory;
use crate::modes::{default_resolution, AngularModes};
use crate::series::ModeSeries;
use crate::slice::{apply_supertranslation_update, four_momentum_from_aspect};

/// The Moreschi super-momentum aspect over a span of retarded time.
///
/// This is the quantity the Moreschi frame-fixing algorithm iterates on: a
/// spin-0 series whose `ell <= 1` moments carry the Bondi four-momentum and
/// whose higher moments measure the supertranslation ambiguity of the frame.
#[derive(Debug, Clone)]
pub struct SuperMomentumHistory {
    series: ModeSeries,
}

impl SuperMomentumHistory {
    /// Build a history from explicit `(time, aspect)` samples. The aspects
    /// must all carry spin 0.
    pub fn new(times: Box<[f64]>, data: Vec<AngularModes>) -> Result<SuperMomentumHistory, ScriError> {
        let series = ModeSeries::new(times, data)?;

        if series.spin() != 0 {
            return Err(ScriError::ShapeMismatch(
                "SuperMomentumHistory::new",
                format!("aspect has spin {}, expected 0", series.spin()),
            ));
        }

        Ok(SuperMomentumHistory { series })
    }

    /// Extract the super-momentum aspect from every slice of a full history
    pub fn from_history(history: &AsymptoticHistory) -> Result<SuperMomentumHistory, ScriError> {
        let mut data = Vec::with_capacity(history.n_times());

        for i in 0..history.n_times() {
            data.push(history.slice_at(i)?.super_momentum()?);
        }

        SuperMomentumHistory::new(history.times().to_vec().into_boxed_slice(), data)
    }

    /// Number of time samples
    pub fn n_times(&self) -> usize {
        self.series.n_times()
    }

    /// The time grid
    pub fn times(&self) -> &[f64] {
        self.series.times()
    }

    /// Common maximum degree of the aspects
    pub fn ell_max(&self) -> u32 {
        self.series.ell_max()
    }

    /// Aspect at sample index `i`
    pub fn at(&self, i: usize) -> Result<&AngularModes, ScriError> {
        self.series.at(i)
    }

    /// Aspect at an arbitrary time, interpolated and clamped like
    /// [ModeSeries::sample]
    pub fn sample(&self, t: f64) -> AngularModes {
        self.series.sample(t)
    }

    /// The super-momentum on the transformed cut through `u' = 0` for a fixed
    /// boost (given as its `OneOverK` function) and supertranslation.
    ///
    /// Per output direction the aspect is read at the shifted retarded time,
    /// evaluated at the transported frame, shifted by the inhomogeneous
    /// `edth^2 edthbar^2 delta` term and scaled by the cube of the conformal
    /// factor.
    pub fn bms_transform(
        &self,
        one_over_k: &AngularModes,
        delta: &AngularModes,
    ) -> Result<AngularModes, ScriError> {
        if delta.spin() != 0 {
            return Err(ScriError::ShapeMismatch(
                "SuperMomentumHistory::bms_transform",
                format!("supertranslation has spin {}, expected 0", delta.spin()),
            ));
        }

        let v = BoostVelocity::from_one_over_k(one_over_k)?;

        let ell_max = self
            .ell_max()
            .max(one_over_k.ell_max())
            .max(delta.ell_max());
        let res = default_resolution(ell_max);

        let inhomogeneous = delta.edth2edthbar2();
        let points = lattice_points(res, res);
        let mut out = Vec::with_capacity(points.len());

        for &(theta, phi) in &points {
            let n = BoostVelocity::direction(theta, phi);
            let rotor = v.frame_rotor(theta, phi);
            let k = 1. / v.inverse_conformal_factor_boosted(&n);

            let u_src = delta.evaluate_at_rotor(&rotor).re;
            let psi = self.sample(u_src).evaluate_at_rotor(&rotor);
            let shift = inhomogeneous.evaluate_at_rotor(&rotor);

            out.push(k * k * k * (psi - shift));
        }

        let grid = AngularGrid::new(0, res, res, out.into_boxed_slice())?;
        AngularModes::from_grid(&grid, ell_max)
    }

    /// One Moreschi refinement step: transform with the current estimates,
    /// fold the residual mass dipole into the boost and the residual
    /// `ell >= 2` aspect into the supertranslation, writing both back.
    ///
    /// Returns the residual of the transformed aspect before the update, the
    /// quantity driven to zero at the fixed point.
    pub fn moreschi_iteration(
        &self,
        one_over_k: &mut AngularModes,
        delta: &mut AngularModes,
    ) -> Result<f64, ScriError> {
        let psi = self.bms_transform(one_over_k, delta)?;

        let p = four_momentum_from_aspect(&psi);
        let w = Vector3::new(p[1], p[2], p[3]) / p[0];

        let v = BoostVelocity::from_one_over_k(one_over_k)?.compose(&w)?;
        *one_over_k = v.one_over_k(one_over_k.ell_max())?;

        apply_supertranslation_update(delta, &psi)?;

        Ok(residual(&psi, &w))
    }

    /// Solve for the Moreschi frame of this history: the boost and
    /// supertranslation under which the transformed super-momentum has
    /// vanishing mass dipole and no `ell >= 2` content on the `u' = 0` cut.
    ///
    /// Iterates from the rest frame until the residual drops below
    /// `tolerance`, at most `max_iterations` times. On exhaustion the
    /// best-residual estimate found is reported inside
    /// [ScriError::NonConvergence] so a caller can still inspect or reuse it.
    pub fn moreschi_frame(
        &self,
        max_iterations: u64,
        tolerance: f64,
    ) -> Result<(AngularModes, AngularModes), ScriError> {
        let ell_max = self.ell_max();

        let mut one_over_k = BoostVelocity::zero().one_over_k(ell_max)?;
        let mut delta = AngularModes::zeros(0, ell_max);

        let mut best: Option<(f64, MoreschiEstimate)> = None;

        for _ in 0..max_iterations {
            let residual = self.moreschi_iteration(&mut one_over_k, &mut delta)?;

            if best.as_ref().map_or(true, |(r, _)| residual < *r) {
                best = Some((
                    residual,
                    MoreschiEstimate {
                        one_over_k: one_over_k.clone(),
                        delta: delta.clone(),
                    },
                ));
            }

            if residual < tolerance {
                return Ok((one_over_k, delta));
            }
        }

        let (residual, estimate) =
            best.expect("at least one iteration ran, so a best estimate exists");

        Err(ScriError::NonConvergence {
            iterations: max_iterations,
            residual,
            best: Box::new(estimate),
        })
    }
}

/// Distance of a transformed aspect from the canonical form: the residual
/// mass dipole plus the relative size of its `ell >= 2` content
fn residual(psi: &AngularModes, w: &Vector3<f64>) -> f64 {
    let mut high = 0.;

    for ell in 2..=psi.ell_max() {
        for m in -(ell as i32)..=(ell as i32) {
            high += psi.coefficient(ell, m).norm_sqr();
        }
    }

    let monopole = psi.coefficient(0, 0).norm().max(f64::EPSILON);

    w.norm() + high.sqrt() / monopole
}
