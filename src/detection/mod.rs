//! Multivariate shift detection.
//!
//! The SREWMA chart combines an expanding-window whitening transform, the
//! spatial rank of each new observation, a running energy total and an
//! EWMA recursion into a single scalar statistic compared against a
//! control limit.
//!
//! # Components
//!
//! - [`SrewmaChart`]: orchestrates one monitoring run
//! - [`EnergyAccumulator`]: compensated running total of rank energies
//! - [`EwmaVector`]: exponentially weighted vector of ranks
//!
//! # References
//!
//! - Zou, C., Wang, Z. & Tsung, F. (2012). "A spatial rank-based multivariate
//!   EWMA control chart", *Naval Research Logistics* 59(2), pp. 91-104.
//! - Roberts, S.W. (1959). "Control Chart Tests Based on Geometric Moving Averages",
//!   *Technometrics* 1(3), pp. 239-250.

mod energy;
mod ewma;
mod srewma;

pub use energy::EnergyAccumulator;
pub use ewma::EwmaVector;
pub use srewma::{monitoring_statistic, ChartStatus, SrewmaChart, SrewmaRun, SrewmaStep, StepFailure};
