//! # u-srewma
//!
//! Distribution-free detection of mean shifts in multivariate process
//! streams with the spatial-rank EWMA (SREWMA) control chart.
//!
//! The chart needs no multivariate-normality assumption: observations are
//! whitened against an expanding reference set, reduced to their spatial
//! ranks, smoothed by an EWMA recursion and normalized by the running mean
//! rank energy.
//!
//! ## Modules
//!
//! - [`detection`]: The SREWMA chart, its energy accumulator and EWMA vector
//! - [`whitening`]: Covariance estimation and the Cholesky whitening transform
//! - [`rank`]: Multivariate spatial ranks
//! - [`reference`]: Append-only reference set buffer
//! - [`dataset`]: Labeled observation matrix and disjoint subsampling
//! - [`config`]: Chart parameters
//! - [`error`]: Error taxonomy
//!
//! ## Design Philosophy
//!
//! - **Explicit state**: every piece of chart state lives in one
//!   [`detection::SrewmaChart`] value, mutated only at step boundaries
//! - **No silent fudging**: singular covariances and non-finite inputs are
//!   reported with their step, never smoothed over
//! - **Research-backed**: algorithms reference the literature they implement

pub mod config;
pub mod dataset;
pub mod detection;
pub mod error;
pub mod rank;
pub mod reference;
pub mod whitening;

pub use config::SrewmaConfig;
pub use error::SrewmaError;
