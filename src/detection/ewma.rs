//! Exponentially weighted moving average of rank vectors.
//!
//! # Algorithm
//!
//! The EWMA vector is defined elementwise as:
//!
//! ```text
//! v_t = (1 - lambda) * v_{t-1} + lambda * r_t,   v_0 = 0
//! ```
//!
//! Each `v_t` depends on `v_{t-1}`, so the recursion is strictly sequential.
//!
//! If the ranks are uncorrelated with common energy `E‖r‖² = ε`, the
//! asymptotic covariance of `v_t` is
//!
//! ```text
//! Cov(v_t) -> lambda / (2 - lambda) * (ε / p) * I
//! ```
//!
//! which is the factor the SREWMA statistic divides out.
//!
//! # Parameters
//!
//! - **lambda**: smoothing constant in (0, 1). Smaller values give more weight
//!   to historical data and are better at detecting small shifts.
//!   Typical range: 0.02-0.2.
//!
//! # Reference
//!
//! Roberts, S.W. (1959). "Control Chart Tests Based on Geometric Moving Averages",
//! *Technometrics* 1(3), pp. 239-250.

use serde::Serialize;

use crate::rank::RankVector;

/// EWMA state vector with its fixed smoothing constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EwmaVector {
    /// Smoothing constant (0 < lambda < 1).
    lambda: f64,
    /// Current smoothed vector v_t.
    state: Vec<f64>,
}

impl EwmaVector {
    /// Creates `v_0 = 0` of dimension `dim`.
    ///
    /// # Returns
    ///
    /// `None` if `dim` is zero or `lambda` is not in (0, 1).
    pub fn new(dim: usize, lambda: f64) -> Option<Self> {
        if dim == 0 {
            return None;
        }
        if !lambda.is_finite() || lambda <= 0.0 || lambda >= 1.0 {
            return None;
        }
        Some(Self {
            lambda,
            state: vec![0.0; dim],
        })
    }

    /// Smoothing constant.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Dimension of the vector.
    pub fn dim(&self) -> usize {
        self.state.len()
    }

    /// Current components of `v_t`.
    pub fn as_slice(&self) -> &[f64] {
        &self.state
    }

    /// Squared norm `‖v_t‖²`.
    pub fn norm_squared(&self) -> f64 {
        self.state.iter().map(|v| v * v).sum()
    }

    /// Asymptotic variance factor `lambda / (2 - lambda)`.
    pub fn asymptotic_variance_factor(&self) -> f64 {
        self.lambda / (2.0 - self.lambda)
    }

    /// Advances the recursion by one rank vector, returning `v_t`.
    ///
    /// `rank` must have `dim()` components.
    #[must_use]
    pub fn step(&self, rank: &RankVector) -> Self {
        let state = self
            .state
            .iter()
            .zip(rank.as_slice())
            .map(|(&v, &r)| (1.0 - self.lambda) * v + self.lambda * r)
            .collect();
        Self {
            lambda: self.lambda,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(c: &[f64]) -> RankVector {
        RankVector::from_components(c.to_vec())
    }

    #[test]
    fn test_starts_at_zero() {
        let v = EwmaVector::new(3, 0.2).expect("valid params");
        assert_eq!(v.as_slice(), &[0.0, 0.0, 0.0]);
        assert_eq!(v.norm_squared(), 0.0);
    }

    #[test]
    fn test_single_step() {
        // v_1 = 0.8 * 0 + 0.2 * r
        let v = EwmaVector::new(2, 0.2).expect("valid params");
        let v1 = v.step(&rank(&[0.5, -1.0]));
        assert!((v1.as_slice()[0] - 0.1).abs() < 1e-15);
        assert!((v1.as_slice()[1] + 0.2).abs() < 1e-15);
        // previous state untouched
        assert_eq!(v.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn test_constant_rank_converges() {
        // Repeated r: v_t = (1 - (1-λ)^t) r
        let lambda = 0.25;
        let mut v = EwmaVector::new(2, lambda).expect("valid params");
        let r = rank(&[0.6, 0.8]);
        for _ in 0..10 {
            v = v.step(&r);
        }
        let factor = 1.0 - (1.0 - lambda).powi(10);
        assert!((v.as_slice()[0] - factor * 0.6).abs() < 1e-12);
        assert!((v.as_slice()[1] - factor * 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_small_lambda_responds_slower() {
        let r = rank(&[1.0, 0.0]);
        let mut slow = EwmaVector::new(2, 0.05).expect("valid params");
        let mut fast = EwmaVector::new(2, 0.25).expect("valid params");
        for _ in 0..5 {
            slow = slow.step(&r);
            fast = fast.step(&r);
        }
        assert!(
            fast.norm_squared() > slow.norm_squared(),
            "fast {} should exceed slow {}",
            fast.norm_squared(),
            slow.norm_squared()
        );
    }

    #[test]
    fn test_asymptotic_variance_factor() {
        let v = EwmaVector::new(2, 0.1).expect("valid params");
        assert!((v.asymptotic_variance_factor() - 0.1 / 1.9).abs() < 1e-15);
    }

    #[test]
    fn test_invalid_params() {
        assert!(EwmaVector::new(0, 0.1).is_none());
        assert!(EwmaVector::new(2, 0.0).is_none());
        assert!(EwmaVector::new(2, 1.0).is_none());
        assert!(EwmaVector::new(2, -0.1).is_none());
        assert!(EwmaVector::new(2, f64::NAN).is_none());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn tiny_lambda_barely_moves(
            start in proptest::collection::vec(-1.0_f64..1.0, 3),
            r in proptest::collection::vec(-1.0_f64..1.0, 3),
        ) {
            let lambda = 1e-9;
            let mut v = EwmaVector::new(3, lambda).expect("valid params");
            v.state = start.clone();
            let next = v.step(&RankVector::from_components(r));
            // |v_t - v_{t-1}| = λ |r - v_{t-1}| <= 2λ
            for (a, b) in next.as_slice().iter().zip(&start) {
                prop_assert!((a - b).abs() <= 2.0 * lambda + 1e-15);
            }
        }

        #[test]
        fn norm_stays_within_rank_bound(
            ranks in proptest::collection::vec(
                proptest::collection::vec(-0.577_f64..0.577, 3),
                1..50,
            ),
            lambda in 0.01_f64..0.99,
        ) {
            // ‖r‖ <= 1 for every input, so the convex combination keeps ‖v‖ <= 1
            let mut v = EwmaVector::new(3, lambda).expect("valid params");
            for r in ranks {
                v = v.step(&RankVector::from_components(r));
                prop_assert!(v.norm_squared() <= 1.0 + 1e-12);
            }
        }
    }
}
