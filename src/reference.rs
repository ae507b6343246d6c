//! Append-only reference set.
//!
//! Observations are stored row-major in a single growable buffer, so adding
//! the monitored observation at every step is an amortized O(p) append and
//! the whole set can be handed to the whitening product without copying.

use crate::error::{first_non_finite, InputSite, ReferenceDefect, SrewmaError};

/// Expanding window of past observations, reference and monitored alike.
///
/// # Invariants
///
/// - Every row has exactly `dim` features, all finite.
/// - Rows are never modified or removed once appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSet {
    dim: usize,
    data: Vec<f64>,
}

impl ReferenceSet {
    /// Creates an empty set of dimension `dim` with room for `capacity` rows.
    pub fn with_capacity(dim: usize, capacity: usize) -> Self {
        Self {
            dim,
            data: Vec::with_capacity(dim * capacity),
        }
    }

    /// Builds a set from a reference sample.
    ///
    /// The dimension is taken from the first row. Rows are validated the way
    /// [`ReferenceSet::push`] validates them, reported as reference rows.
    ///
    /// # Errors
    ///
    /// - `InsufficientReferenceSize(TooFew)` for an empty sample or rows
    ///   without features.
    /// - `DimensionMismatch` for a ragged row.
    /// - `InsufficientReferenceSize(NonFinite)` for NaN or infinite values.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, SrewmaError> {
        let dim = rows.first().map_or(0, |r| r.as_ref().len());
        if dim == 0 {
            // p is unknown here; one feature already needs two rows.
            return Err(ReferenceDefect::TooFew {
                required: 2,
                actual: rows.len(),
            }
            .into());
        }
        let mut set = Self::with_capacity(dim, rows.len());
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if let Some(feature) = first_non_finite(values) {
                return Err(ReferenceDefect::NonFinite { row, feature }.into());
            }
            set.validate(values, InputSite::Reference { row })?;
            set.data.extend_from_slice(values);
        }
        Ok(set)
    }

    /// Checks the feature count and finiteness of a candidate row.
    pub fn validate(&self, values: &[f64], site: InputSite) -> Result<(), SrewmaError> {
        if values.len() != self.dim {
            return Err(SrewmaError::DimensionMismatch {
                site,
                expected: self.dim,
                actual: values.len(),
            });
        }
        if let Some(feature) = first_non_finite(values) {
            return Err(SrewmaError::NonFiniteInput { site, feature });
        }
        Ok(())
    }

    /// Appends one validated observation.
    pub fn push(&mut self, values: &[f64], site: InputSite) -> Result<(), SrewmaError> {
        self.validate(values, site)?;
        self.data.extend_from_slice(values);
        Ok(())
    }

    /// Number of features per observation.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored observations.
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    /// Whether no observation has been stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Observation `i`, or `None` past the end.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        let start = i.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    /// Iterates observations in insertion order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.dim.max(1))
    }

    /// Row-major view of all observations (`len() * dim()` values).
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Feature-wise sample mean, or `None` when empty.
    pub fn mean(&self) -> Option<Vec<f64>> {
        let n = self.len();
        if n == 0 {
            return None;
        }
        let mut mean = vec![0.0; self.dim];
        for row in self.rows() {
            for (m, &x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n as f64;
        }
        Some(mean)
    }
}
