//! Multivariate spatial rank.
//!
//! # Algorithm
//!
//! For a whitened query point `z` and a context `z_1, ..., z_n` the spatial
//! rank is the mean spatial sign of the differences:
//!
//! ```text
//! r(z) = (1/n) Σ S(z − z_i),   S(u) = u / ‖u‖,  S(0) = 0
//! ```
//!
//! Each term has norm at most one, so `‖r(z)‖ ≤ 1`.
//!
//! # Ties
//!
//! A context point coincident with the query contributes the zero vector and
//! still counts in the divisor `n`. The only undefined case is an empty
//! context, which is an error rather than a silent zero.
//!
//! # Reference
//!
//! Möttönen, J. & Oja, H. (1995). "Multivariate spatial sign and rank methods",
//! *Journal of Nonparametric Statistics* 5(2), pp. 201-213.

use serde::Serialize;

use crate::error::{ReferenceDefect, SrewmaError};
use crate::whitening::WhitenedSet;

/// A `p`-dimensional spatial rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankVector {
    components: Vec<f64>,
}

impl RankVector {
    /// Wraps raw components.
    pub fn from_components(components: Vec<f64>) -> Self {
        Self { components }
    }

    /// Rank components.
    pub fn as_slice(&self) -> &[f64] {
        &self.components
    }

    /// Number of components.
    pub fn dim(&self) -> usize {
        self.components.len()
    }

    /// Squared Euclidean norm, the rank's energy.
    pub fn norm_squared(&self) -> f64 {
        self.components.iter().map(|c| c * c).sum()
    }
}

/// Spatial rank of `point` relative to `context`.
///
/// The context must not contain the query itself; use
/// [`leave_one_out_ranks`] to rank each member of a set against the rest.
///
/// # Errors
///
/// `InsufficientReferenceSize(EmptyContext)` when the context is empty.
///
/// # Examples
///
/// ```
/// use u_srewma::rank::spatial_rank;
///
/// let context: [&[f64]; 2] = [&[-1.0, 0.0], &[-3.0, 0.0]];
/// let r = spatial_rank(&[1.0, 0.0], context).unwrap();
/// assert!((r.as_slice()[0] - 1.0).abs() < 1e-15);
/// assert!(r.as_slice()[1].abs() < 1e-15);
/// ```
///
/// # Complexity
///
/// Time: O(n p), Space: O(p)
pub fn spatial_rank<'a, I>(point: &[f64], context: I) -> Result<RankVector, SrewmaError>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut sum = vec![0.0; point.len()];
    let mut diff = vec![0.0; point.len()];
    let mut n = 0usize;

    for other in context {
        n += 1;
        for ((d, &z), &c) in diff.iter_mut().zip(point).zip(other) {
            *d = z - c;
        }
        let norm = diff.iter().map(|d| d * d).sum::<f64>().sqrt();
        // Coincident points: S(0) = 0
        if norm > 0.0 {
            for (s, &d) in sum.iter_mut().zip(&diff) {
                *s += d / norm;
            }
        }
    }

    if n == 0 {
        return Err(ReferenceDefect::EmptyContext.into());
    }
    for s in &mut sum {
        *s /= n as f64;
    }
    Ok(RankVector::from_components(sum))
}

/// Rank of every point of `set` against all the other points.
///
/// # Errors
///
/// `InsufficientReferenceSize(EmptyContext)` for sets with fewer than two
/// points.
///
/// # Complexity
///
/// Time: O(n² p), Space: O(n p)
pub fn leave_one_out_ranks(set: &WhitenedSet) -> Result<Vec<RankVector>, SrewmaError> {
    set.points()
        .enumerate()
        .map(|(j, point)| {
            let others = set
                .points()
                .enumerate()
                .filter(move |&(i, _)| i != j)
                .map(|(_, other)| other);
            spatial_rank(point, others)
        })
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rank_norm_bounded(
            point in proptest::collection::vec(-1e3_f64..1e3, 3),
            context in proptest::collection::vec(
                proptest::collection::vec(-1e3_f64..1e3, 3),
                1..=40,
            )
        ) {
            let r = spatial_rank(&point, context.iter().map(|c| c.as_slice()))
                .expect("non-empty context");
            prop_assert_eq!(r.dim(), 3);
            prop_assert!(r.norm_squared() <= 1.0 + 1e-12, "‖r‖² = {}", r.norm_squared());
        }
    }
}
