//! Error taxonomy shared by the whole crate

use thiserror::Error;

use crate::modes::AngularModes;

/// Best estimate produced by a Moreschi iteration that failed to converge.
///
/// Carried inside [ScriError::NonConvergence] so a caller can inspect how far
/// the solver got instead of losing the partial result.
#[derive(Debug, Clone)]
pub struct MoreschiEstimate {
    /// Inverse conformal factor of the best boost found
    pub one_over_k: AngularModes,
    /// Supertranslation of the best frame found
    pub delta: AngularModes,
}

/// Errors that can be returned by angular-field algebra, history assembly and
/// the BMS frame solver
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScriError {
    /// Grid or mode sizes/spins are incompatible for the requested operation.
    ///
    /// The first parameter names the operation, the second describes the
    /// offending shapes.
    #[error("shape mismatch in `{0}`: {1}")]
    ShapeMismatch(&'static str, String),
    /// Input time series are not aligned on a single strictly increasing grid.
    #[error("time grids are not aligned: {0}")]
    TimeGridMismatch(String),
    /// A slice field index or grid/mode index lies outside the valid bounds.
    ///
    /// The first parameter is the requested index, the second the largest
    /// valid index.
    #[error("index {0} out of range (last valid index is {1})")]
    IndexOutOfRange(usize, usize),
    /// A boost velocity with `|v| >= 1`, or an inverse conformal factor that
    /// does not correspond to any such velocity.
    #[error("boost velocity is not physical (|v| = {0})")]
    DegenerateBoost(f64),
    /// The Moreschi iteration exhausted its iteration budget before reaching
    /// the requested tolerance. The best estimate reached is retained for
    /// diagnostics.
    #[error("Moreschi iteration did not converge after {iterations} iterations (residual {residual:e})")]
    NonConvergence {
        /// Number of iterations performed
        iterations: u64,
        /// Smallest residual seen over all iterations
        residual: f64,
        /// Best `(one_over_k, delta)` estimate reached
        best: Box<MoreschiEstimate>,
    },
}
