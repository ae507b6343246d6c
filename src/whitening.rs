//! Whitening transform estimated from a reference set.
//!
//! # Algorithm
//!
//! With the unbiased sample covariance `S` factored as `S = L Lᵀ` (Cholesky),
//! the transform is `M = L⁻¹`. Then
//!
//! ```text
//! Mᵀ M = L⁻ᵀ L⁻¹ = (L Lᵀ)⁻¹ = S⁻¹
//! cov(M x) = L⁻¹ S L⁻ᵀ = I
//! ```
//!
//! so whitened observations have identity sample covariance.
//!
//! # Singularity
//!
//! The pivot ratio of feature `i` is `L_ii² / S_ii`, the share of that
//! feature's variance not explained by the features before it. The smallest
//! ratio is compared against an explicit tolerance; see
//! [`DEFAULT_SINGULAR_TOLERANCE`](crate::config::DEFAULT_SINGULAR_TOLERANCE).
//!
//! # Examples
//!
//! ```
//! use u_srewma::reference::ReferenceSet;
//! use u_srewma::whitening::WhiteningTransform;
//!
//! let set = ReferenceSet::from_rows(&[
//!     [2.0, 0.0], [-2.0, 0.0], [0.0, 1.0], [0.0, -1.0], [0.0, 0.0],
//! ]).unwrap();
//! let m = WhiteningTransform::estimate(&set, 1e-10).unwrap();
//! let cov = m.whiten(&set).covariance().unwrap();
//! assert!((cov[(0, 0)] - 1.0).abs() < 1e-12);
//! assert!(cov[(0, 1)].abs() < 1e-12);
//! ```

use nalgebra::{DMatrix, DVector};

use crate::reference::ReferenceSet;

/// Reasons a transform cannot be estimated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WhiteningError {
    /// Fewer than `p + 1` observations.
    #[error("{actual} observations cannot support a {required}-row covariance estimate")]
    TooFew { required: usize, actual: usize },

    /// Covariance not positive definite within the declared tolerance.
    #[error("singular covariance: pivot ratio {pivot_ratio:e} <= tolerance {tolerance:e}")]
    Singular { pivot_ratio: f64, tolerance: f64 },
}

/// Unbiased sample covariance of row-major `data` with `dim` columns.
fn covariance_of_rows(data: &[f64], dim: usize) -> Option<DMatrix<f64>> {
    if dim == 0 {
        return None;
    }
    let n = data.len() / dim;
    if n < 2 {
        return None;
    }

    let mut mean = vec![0.0; dim];
    for row in data.chunks_exact(dim) {
        for (m, &x) in mean.iter_mut().zip(row) {
            *m += x;
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }

    let mut cov = DMatrix::<f64>::zeros(dim, dim);
    let mut centered = vec![0.0; dim];
    for row in data.chunks_exact(dim) {
        for ((c, &x), &m) in centered.iter_mut().zip(row).zip(&mean) {
            *c = x - m;
        }
        for i in 0..dim {
            for j in i..dim {
                cov[(i, j)] += centered[i] * centered[j];
            }
        }
    }

    let denom = (n - 1) as f64;
    for i in 0..dim {
        for j in i..dim {
            let v = cov[(i, j)] / denom;
            cov[(i, j)] = v;
            cov[(j, i)] = v;
        }
    }
    Some(cov)
}

/// Unbiased sample covariance of a reference set (columns = features).
///
/// Returns `None` for fewer than two observations.
pub fn sample_covariance(set: &ReferenceSet) -> Option<DMatrix<f64>> {
    covariance_of_rows(set.as_slice(), set.dim())
}

/// Linear map `M` with `Mᵀ M = S⁻¹` for the covariance `S` of a reference set.
#[derive(Debug, Clone, PartialEq)]
pub struct WhiteningTransform {
    matrix: DMatrix<f64>,
    pivot_ratio: f64,
}

impl WhiteningTransform {
    /// Estimates the transform from `reference`.
    ///
    /// Pure function of its input; `tolerance` bounds the smallest admissible
    /// pivot ratio.
    ///
    /// # Complexity
    ///
    /// Time: O(n p² + p³), Space: O(p²)
    pub fn estimate(reference: &ReferenceSet, tolerance: f64) -> Result<Self, WhiteningError> {
        let p = reference.dim();
        let n = reference.len();
        if p == 0 || n < p + 1 {
            return Err(WhiteningError::TooFew {
                required: p + 1,
                actual: n,
            });
        }

        let cov = sample_covariance(reference).ok_or(WhiteningError::TooFew {
            required: p + 1,
            actual: n,
        })?;
        let variances: Vec<f64> = (0..p).map(|i| cov[(i, i)]).collect();

        let singular = |pivot_ratio: f64| WhiteningError::Singular {
            pivot_ratio,
            tolerance,
        };

        let l = cov.cholesky().ok_or_else(|| singular(0.0))?.l();

        let pivot_ratio = (0..p)
            .map(|i| {
                if variances[i] > 0.0 {
                    l[(i, i)] * l[(i, i)] / variances[i]
                } else {
                    0.0
                }
            })
            .fold(f64::INFINITY, f64::min);
        if pivot_ratio <= tolerance {
            return Err(singular(pivot_ratio));
        }

        let matrix = l
            .solve_lower_triangular(&DMatrix::identity(p, p))
            .ok_or_else(|| singular(pivot_ratio))?;

        Ok(Self {
            matrix,
            pivot_ratio,
        })
    }

    /// Number of features the transform acts on.
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// The lower-triangular `p × p` matrix `M = L⁻¹`.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Smallest Cholesky pivot ratio seen during estimation.
    pub fn pivot_ratio(&self) -> f64 {
        self.pivot_ratio
    }

    /// Whitens a single observation.
    ///
    /// # Panics
    ///
    /// If `x.len() != self.dim()`.
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        let z = &self.matrix * DVector::from_column_slice(x);
        z.as_slice().to_vec()
    }

    /// Whitens every observation of `set` in one matrix product.
    ///
    /// The row-major `n × p` buffer is read as a column-major `p × n` matrix
    /// `Xᵀ`, so `M Xᵀ` holds whitened observations as contiguous columns.
    ///
    /// # Panics
    ///
    /// If `set.dim() != self.dim()`.
    pub fn whiten(&self, set: &ReferenceSet) -> WhitenedSet {
        let xt = DMatrix::from_column_slice(set.dim(), set.len(), set.as_slice());
        WhitenedSet {
            points: &self.matrix * xt,
        }
    }
}

/// Whitened observations, one contiguous `p`-vector per point.
#[derive(Debug, Clone, PartialEq)]
pub struct WhitenedSet {
    points: DMatrix<f64>,
}

impl WhitenedSet {
    /// Number of features per point.
    pub fn dim(&self) -> usize {
        self.points.nrows()
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.ncols()
    }

    /// Whether the set holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.ncols() == 0
    }

    /// Point `i`, or `None` past the end.
    pub fn point(&self, i: usize) -> Option<&[f64]> {
        let p = self.dim();
        let start = i.checked_mul(p)?;
        self.points.as_slice().get(start..start + p)
    }

    /// Iterates points in the order of the source set.
    pub fn points(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.points.as_slice().chunks_exact(self.dim().max(1))
    }

    /// Sample covariance of the whitened points.
    pub fn covariance(&self) -> Option<DMatrix<f64>> {
        covariance_of_rows(self.points.as_slice(), self.dim())
    }
}
