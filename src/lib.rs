//! Asymptotic gravitational-wave geometry and BMS frame fixing
#![allow(clippy::needless_range_loop)] // Makes math code less readable
#![warn(missing_docs)]

pub mod boost;
pub mod error;
pub mod grid;
pub mod history;
pub mod modes;
pub mod series;
pub mod slice;
pub mod supermomentum;
mod swsh;

pub use boost::BoostVelocity;
pub use error::{MoreschiEstimate, ScriError};
pub use grid::AngularGrid;
pub use history::AsymptoticHistory;
pub use modes::AngularModes;
pub use series::ModeSeries;
pub use slice::{AsymptoticSlice, AsymptoticSliceGrid, Field};
pub use supermomentum::SuperMomentumHistory;
