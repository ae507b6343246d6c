//! Chart configuration.
//!
//! The control limit is supplied by the caller; calibrating it (for a target
//! in-control average run length) is outside this crate.
//!
//! # Examples
//!
//! ```
//! use u_srewma::config::SrewmaConfig;
//!
//! let config = SrewmaConfig::new(0.1, 10.0).unwrap();
//! assert!((config.lambda - 0.1).abs() < 1e-15);
//! assert!(SrewmaConfig::new(1.5, 10.0).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SrewmaError;

/// Default threshold on the smallest Cholesky pivot ratio.
///
/// The pivot ratio of feature `i` is `L_ii² / S_ii`: the fraction of that
/// feature's variance left unexplained by the preceding features
/// (`1 − R²_i`). An exactly collinear feature leaves only rounding residue,
/// on the order of `1e-16`; a feature correlated at |r| = 0.99999 still has
/// a ratio of about `2e-5`. `1e-10` sits between the two with six orders of
/// magnitude of margin on each side. The ratio is scale-free, so features
/// measured in very different units are never rejected for their units.
pub const DEFAULT_SINGULAR_TOLERANCE: f64 = 1e-10;

fn default_singular_tolerance() -> f64 {
    DEFAULT_SINGULAR_TOLERANCE
}

/// Parameters fixed for the lifetime of one monitoring run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SrewmaConfig {
    /// EWMA smoothing constant, `0 < lambda < 1`.
    pub lambda: f64,
    /// Upper control limit (UCL); `Q_t > UCL` signals.
    pub control_limit: f64,
    /// Covariance is treated as singular when the smallest pivot ratio is
    /// at or below this value. See [`DEFAULT_SINGULAR_TOLERANCE`].
    #[serde(default = "default_singular_tolerance")]
    pub singular_tolerance: f64,
}

impl SrewmaConfig {
    /// Creates a validated configuration with the default singular tolerance.
    pub fn new(lambda: f64, control_limit: f64) -> Result<Self, SrewmaError> {
        let config = Self {
            lambda,
            control_limit,
            singular_tolerance: DEFAULT_SINGULAR_TOLERANCE,
        };
        config.validate()?;
        Ok(config)
    }

    /// Replaces the singular tolerance, re-validating the result.
    pub fn with_singular_tolerance(self, tolerance: f64) -> Result<Self, SrewmaError> {
        let config = Self {
            singular_tolerance: tolerance,
            ..self
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every parameter range.
    ///
    /// Deserialized configurations bypass [`SrewmaConfig::new`], so the chart
    /// calls this again at initialization.
    pub fn validate(&self) -> Result<(), SrewmaError> {
        if !self.lambda.is_finite() || self.lambda <= 0.0 || self.lambda >= 1.0 {
            return Err(SrewmaError::InvalidParameter {
                name: "lambda",
                value: self.lambda,
            });
        }
        if !self.control_limit.is_finite() || self.control_limit <= 0.0 {
            return Err(SrewmaError::InvalidParameter {
                name: "control_limit",
                value: self.control_limit,
            });
        }
        if !self.singular_tolerance.is_finite()
            || self.singular_tolerance < 0.0
            || self.singular_tolerance >= 1.0
        {
            return Err(SrewmaError::InvalidParameter {
                name: "singular_tolerance",
                value: self.singular_tolerance,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_tolerance() {
        let config = SrewmaConfig::new(0.05, 12.0).expect("valid params");
        assert!((config.singular_tolerance - DEFAULT_SINGULAR_TOLERANCE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_params() {
        // lambda must be in (0, 1)
        assert!(SrewmaConfig::new(0.0, 10.0).is_err());
        assert!(SrewmaConfig::new(1.0, 10.0).is_err());
        assert!(SrewmaConfig::new(-0.1, 10.0).is_err());
        assert!(SrewmaConfig::new(f64::NAN, 10.0).is_err());

        // control limit must be positive and finite
        assert!(SrewmaConfig::new(0.1, 0.0).is_err());
        assert!(SrewmaConfig::new(0.1, f64::INFINITY).is_err());

        let config = SrewmaConfig::new(0.1, 10.0).expect("valid params");
        assert!(config.with_singular_tolerance(-1e-3).is_err());
        assert!(config.with_singular_tolerance(1.0).is_err());
        assert!(config.with_singular_tolerance(0.0).is_ok());
    }

    #[test]
    fn test_invalid_param_reports_name() {
        let err = SrewmaConfig::new(2.0, 10.0).unwrap_err();
        assert_eq!(
            err,
            SrewmaError::InvalidParameter {
                name: "lambda",
                value: 2.0
            }
        );
    }

    #[test]
    fn test_deserialize_defaults_tolerance() {
        let config: SrewmaConfig =
            serde_json::from_str(r#"{"lambda": 0.1, "control_limit": 10.0}"#).expect("parse");
        assert!((config.singular_tolerance - DEFAULT_SINGULAR_TOLERANCE).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_out_of_range_caught_by_validate() {
        let config: SrewmaConfig =
            serde_json::from_str(r#"{"lambda": 1.5, "control_limit": 10.0}"#).expect("parse");
        assert!(config.validate().is_err());
    }
}
