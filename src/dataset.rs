//! Labeled observation matrix and reference/monitoring subsampling.
//!
//! This is the in-memory side of data provisioning: it holds an already
//! cleaned numeric matrix with a parallel label vector and draws disjoint
//! subsamples without replacement. Acquiring and cleaning the data (missing
//! values, constant columns) happens before a [`LabeledDataset`] is built.
//!
//! # Examples
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use u_srewma::dataset::{Label, LabeledDataset, SamplingPlan};
//!
//! let rows: Vec<[f64; 2]> = (0..20).map(|i| [i as f64, (i * i) as f64]).collect();
//! let labels: Vec<Label> = (0..20)
//!     .map(|i| if i < 15 { Label::InControl } else { Label::OutOfControl })
//!     .collect();
//! let data = LabeledDataset::new(&rows, labels).unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let sample = data.draw(&mut rng, &SamplingPlan::shifted(10, 5)).unwrap();
//! assert_eq!(sample.reference.len(), 10);
//! assert_eq!(sample.monitoring.len(), 5);
//! ```

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Process state recorded for an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    InControl,
    OutOfControl,
}

/// Errors building or sampling a [`LabeledDataset`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset has no rows or no features")]
    Empty,

    #[error("{rows} rows but {labels} labels")]
    LabelCountMismatch { rows: usize, labels: usize },

    #[error("row {row} has {actual} features, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("non-finite value at row {row}, feature {feature}")]
    NonFinite { row: usize, feature: usize },

    #[error("requested {requested} {label:?} rows, only {available} available")]
    NotEnoughRows {
        label: Label,
        requested: usize,
        available: usize,
    },
}

/// Sizes and label of one reference/monitoring draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingPlan {
    /// Number of in-control reference rows (`m`).
    pub reference_size: usize,
    /// Number of monitoring rows (`ni`).
    pub monitoring_size: usize,
    /// Label the monitoring rows are drawn from.
    pub monitoring_label: Label,
}

impl SamplingPlan {
    /// Monitoring rows drawn from the remaining in-control rows.
    pub fn in_control(reference_size: usize, monitoring_size: usize) -> Self {
        Self {
            reference_size,
            monitoring_size,
            monitoring_label: Label::InControl,
        }
    }

    /// Monitoring rows drawn from the out-of-control rows.
    pub fn shifted(reference_size: usize, monitoring_size: usize) -> Self {
        Self {
            reference_size,
            monitoring_size,
            monitoring_label: Label::OutOfControl,
        }
    }
}

/// A disjoint reference/monitoring draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Subsample {
    pub reference: Vec<Vec<f64>>,
    pub monitoring: Vec<Vec<f64>>,
    /// Source row of each reference observation.
    pub reference_rows: Vec<usize>,
    /// Source row of each monitoring observation, in stream order.
    pub monitoring_rows: Vec<usize>,
}

/// Read-only labeled observation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    dim: usize,
    data: Vec<f64>,
    labels: Vec<Label>,
}

impl LabeledDataset {
    /// Validates and stores `rows` with their `labels`.
    pub fn new<R: AsRef<[f64]>>(rows: &[R], labels: Vec<Label>) -> Result<Self, DatasetError> {
        let dim = rows.first().map_or(0, |r| r.as_ref().len());
        if dim == 0 {
            return Err(DatasetError::Empty);
        }
        if rows.len() != labels.len() {
            return Err(DatasetError::LabelCountMismatch {
                rows: rows.len(),
                labels: labels.len(),
            });
        }

        let mut data = Vec::with_capacity(rows.len() * dim);
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != dim {
                return Err(DatasetError::RaggedRow {
                    row,
                    expected: dim,
                    actual: values.len(),
                });
            }
            if let Some(feature) = values.iter().position(|v| !v.is_finite()) {
                return Err(DatasetError::NonFinite { row, feature });
            }
            data.extend_from_slice(values);
        }

        Ok(Self { dim, data, labels })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of features per row.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Row `i`, or `None` past the end.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        let start = i.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    /// Label of row `i`.
    pub fn label(&self, i: usize) -> Option<Label> {
        self.labels.get(i).copied()
    }

    /// Indices of all rows carrying `label`, ascending.
    pub fn indices(&self, label: Label) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == label)
            .map(|(i, _)| i)
            .collect()
    }

    /// Draws reference rows from the in-control rows and monitoring rows from
    /// the plan's label, without replacement and never sharing a row.
    ///
    /// # Complexity
    ///
    /// Time: O(n + (m + ni) p)
    pub fn draw<G: Rng + ?Sized>(
        &self,
        rng: &mut G,
        plan: &SamplingPlan,
    ) -> Result<Subsample, DatasetError> {
        let in_control = self.indices(Label::InControl);
        let reference_rows = pick(rng, &in_control, plan.reference_size, Label::InControl)?;

        let candidates: Vec<usize> = self
            .indices(plan.monitoring_label)
            .into_iter()
            .filter(|i| !reference_rows.contains(i))
            .collect();
        let monitoring_rows = pick(rng, &candidates, plan.monitoring_size, plan.monitoring_label)?;

        debug!(
            reference = reference_rows.len(),
            monitoring = monitoring_rows.len(),
            monitoring_label = ?plan.monitoring_label,
            "drew reference/monitoring subsample"
        );

        Ok(Subsample {
            reference: self.collect_rows(&reference_rows),
            monitoring: self.collect_rows(&monitoring_rows),
            reference_rows,
            monitoring_rows,
        })
    }

    fn collect_rows(&self, rows: &[usize]) -> Vec<Vec<f64>> {
        rows.iter()
            .filter_map(|&i| self.row(i))
            .map(<[f64]>::to_vec)
            .collect()
    }
}

/// Picks `amount` distinct entries of `pool` in random order.
fn pick<G: Rng + ?Sized>(
    rng: &mut G,
    pool: &[usize],
    amount: usize,
    label: Label,
) -> Result<Vec<usize>, DatasetError> {
    if amount > pool.len() {
        return Err(DatasetError::NotEnoughRows {
            label,
            requested: amount,
            available: pool.len(),
        });
    }
    Ok(index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|k| pool[k])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dataset() -> LabeledDataset {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, -(i as f64)]).collect();
        let labels = (0..30)
            .map(|i| if i % 3 == 0 { Label::OutOfControl } else { Label::InControl })
            .collect();
        LabeledDataset::new(&rows, labels).expect("valid dataset")
    }

    #[test]
    fn test_construction_and_access() {
        let data = dataset();
        assert_eq!(data.len(), 30);
        assert_eq!(data.dim(), 2);
        assert_eq!(data.row(4), Some(&[4.0, -4.0][..]));
        assert_eq!(data.label(3), Some(Label::OutOfControl));
        assert_eq!(data.label(30), None);
        assert_eq!(data.indices(Label::OutOfControl).len(), 10);
        assert_eq!(data.indices(Label::InControl).len(), 20);
    }

    #[test]
    fn test_invalid_datasets() {
        let empty: [[f64; 2]; 0] = [];
        assert_eq!(LabeledDataset::new(&empty, vec![]), Err(DatasetError::Empty));

        assert_eq!(
            LabeledDataset::new(&[[1.0], [2.0]], vec![Label::InControl]),
            Err(DatasetError::LabelCountMismatch { rows: 2, labels: 1 })
        );

        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert_eq!(
            LabeledDataset::new(&ragged, vec![Label::InControl; 2]),
            Err(DatasetError::RaggedRow {
                row: 1,
                expected: 2,
                actual: 1
            })
        );

        assert_eq!(
            LabeledDataset::new(&[[1.0, f64::NAN]], vec![Label::InControl]),
            Err(DatasetError::NonFinite { row: 0, feature: 1 })
        );
    }

    #[test]
    fn test_in_control_draw_is_disjoint() {
        let data = dataset();
        let mut rng = StdRng::seed_from_u64(42);
        let sample = data
            .draw(&mut rng, &SamplingPlan::in_control(12, 8))
            .expect("enough rows");

        assert_eq!(sample.reference_rows.len(), 12);
        assert_eq!(sample.monitoring_rows.len(), 8);
        for i in &sample.monitoring_rows {
            assert!(!sample.reference_rows.contains(i), "row {i} drawn twice");
        }
        for &i in sample.reference_rows.iter().chain(&sample.monitoring_rows) {
            assert_eq!(data.label(i), Some(Label::InControl));
        }
        // Rows match their source indices
        for (row, &i) in sample.reference.iter().zip(&sample.reference_rows) {
            assert_eq!(Some(row.as_slice()), data.row(i));
        }
    }

    #[test]
    fn test_shifted_draw_uses_out_of_control_rows() {
        let data = dataset();
        let mut rng = StdRng::seed_from_u64(1);
        let sample = data
            .draw(&mut rng, &SamplingPlan::shifted(5, 10))
            .expect("enough rows");
        assert!(sample
            .monitoring_rows
            .iter()
            .all(|&i| data.label(i) == Some(Label::OutOfControl)));
        let mut distinct = sample.monitoring_rows.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 10);
    }

    #[test]
    fn test_draw_reproducible_with_seed() {
        let data = dataset();
        let plan = SamplingPlan::in_control(10, 5);
        let a = data.draw(&mut StdRng::seed_from_u64(9), &plan).expect("enough rows");
        let b = data.draw(&mut StdRng::seed_from_u64(9), &plan).expect("enough rows");
        assert_eq!(a, b);
    }

    #[test]
    fn test_not_enough_rows() {
        let data = dataset();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            data.draw(&mut rng, &SamplingPlan::in_control(25, 1)),
            Err(DatasetError::NotEnoughRows {
                label: Label::InControl,
                requested: 25,
                available: 20
            })
        );
        // 20 in-control rows, 15 used as reference, 5 left for monitoring
        assert_eq!(
            data.draw(&mut rng, &SamplingPlan::in_control(15, 6)),
            Err(DatasetError::NotEnoughRows {
                label: Label::InControl,
                requested: 6,
                available: 5
            })
        );
    }
}
