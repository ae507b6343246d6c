//! Error taxonomy for SREWMA monitoring.
//!
//! Every failure carries enough context (step index, last valid statistic,
//! offending row or feature) for a caller to diagnose it or restart the run
//! with a filtered reference sample. Nothing is retried internally.

use std::fmt;

/// Where a rejected input value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSite {
    /// Row of the reference sample supplied at initialization (0-based).
    Reference { row: usize },
    /// Observation offered at monitoring step `step` (1-based).
    Monitoring { step: usize },
}

impl fmt::Display for InputSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference { row } => write!(f, "reference row {row}"),
            Self::Monitoring { step } => write!(f, "monitoring step {step}"),
        }
    }
}

/// Why a reference collection cannot support whitening or ranking.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReferenceDefect {
    /// Fewer observations than the `p + 1` a nonsingular covariance needs.
    #[error("{actual} observations supplied, at least {required} required")]
    TooFew { required: usize, actual: usize },

    /// Enough rows, but the sample covariance is not positive definite.
    #[error("covariance is rank-deficient (pivot ratio {pivot_ratio:e} <= tolerance {tolerance:e})")]
    RankDeficient { pivot_ratio: f64, tolerance: f64 },

    /// A reference row holds a NaN or infinite value.
    #[error("non-finite value at reference row {row}, feature {feature}")]
    NonFinite { row: usize, feature: usize },

    /// A spatial rank was requested against an empty context.
    #[error("spatial rank requested against an empty context")]
    EmptyContext,
}

/// Errors raised by the SREWMA chart and its components.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SrewmaError {
    /// Reference sample too small, non-finite or rank-deficient at
    /// initialization.
    #[error("insufficient reference sample: {0}")]
    InsufficientReferenceSize(ReferenceDefect),

    /// Observation feature count disagrees with the chart dimension.
    #[error("observation at {site} has {actual} features, expected {expected}")]
    DimensionMismatch {
        site: InputSite,
        expected: usize,
        actual: usize,
    },

    /// Covariance of the growing reference set stopped being invertible.
    #[error(
        "singular covariance at step {step}: pivot ratio {pivot_ratio:e} <= tolerance {tolerance:e} \
         (last statistic {last_statistic:?})"
    )]
    SingularCovariance {
        step: usize,
        pivot_ratio: f64,
        tolerance: f64,
        last_statistic: Option<f64>,
    },

    /// NaN or infinite value rejected before entering the recursion.
    #[error("non-finite value at {site}, feature {feature}")]
    NonFiniteInput { site: InputSite, feature: usize },

    /// Configuration value outside its admissible range.
    #[error("invalid parameter `{name}` = {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

impl From<ReferenceDefect> for SrewmaError {
    fn from(defect: ReferenceDefect) -> Self {
        Self::InsufficientReferenceSize(defect)
    }
}

/// Returns the first non-finite feature of `values`, if any.
pub(crate) fn first_non_finite(values: &[f64]) -> Option<usize> {
    values.iter().position(|v| !v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = SrewmaError::SingularCovariance {
            step: 7,
            pivot_ratio: 1e-14,
            tolerance: 1e-10,
            last_statistic: Some(2.5),
        };
        let msg = err.to_string();
        assert!(msg.contains("step 7"), "{msg}");
        assert!(msg.contains("2.5"), "{msg}");

        let err = SrewmaError::NonFiniteInput {
            site: InputSite::Reference { row: 3 },
            feature: 1,
        };
        assert_eq!(err.to_string(), "non-finite value at reference row 3, feature 1");
    }

    #[test]
    fn test_defect_converts_into_insufficient_reference() {
        let err: SrewmaError = ReferenceDefect::EmptyContext.into();
        assert_eq!(
            err,
            SrewmaError::InsufficientReferenceSize(ReferenceDefect::EmptyContext)
        );
    }

    #[test]
    fn test_non_finite_reference_display() {
        let err: SrewmaError = ReferenceDefect::NonFinite { row: 4, feature: 0 }.into();
        assert_eq!(
            err.to_string(),
            "insufficient reference sample: non-finite value at reference row 4, feature 0"
        );
    }

    #[test]
    fn test_first_non_finite() {
        assert_eq!(first_non_finite(&[1.0, 2.0]), None);
        assert_eq!(first_non_finite(&[1.0, f64::NAN, f64::INFINITY]), Some(1));
    }
}
