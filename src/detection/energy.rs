//! Running energy total used to normalize the SREWMA statistic.
//!
//! # Algorithm
//!
//! ```text
//! RE_t = RE_0 + Σ_{k≤t} ‖r_k‖²
//! ε_t  = RE_t / (m + t)
//! ```
//!
//! `RE_0` sums the leave-one-out rank energies of the `m` reference
//! observations. The total is carried forward exactly, never recomputed.
//!
//! Accumulation uses Neumaier compensated summation, so the rounding error
//! of `RE_t` stays O(ε) independent of run length instead of growing with
//! the number of steps.
//!
//! # Reference
//!
//! Neumaier, A. (1974). "Rundungsfehleranalyse einiger Verfahren zur
//! Summation endlicher Summen", *ZAMM* 54(1), pp. 39-51.

use serde::Serialize;

use crate::rank::RankVector;

/// Compensated running sum of squared rank norms with its observation count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EnergyAccumulator {
    sum: f64,
    compensation: f64,
    count: usize,
}

impl EnergyAccumulator {
    /// An empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates the energies of an initial collection of ranks (`RE_0`).
    pub fn from_ranks<'a, I>(ranks: I) -> Self
    where
        I: IntoIterator<Item = &'a RankVector>,
    {
        ranks
            .into_iter()
            .fold(Self::new(), |acc, rank| acc.update(rank))
    }

    /// Adds one rank vector's energy `‖r‖²`.
    #[must_use]
    pub fn update(self, rank: &RankVector) -> Self {
        self.add_energy(rank.norm_squared())
    }

    /// Adds one raw energy value.
    #[must_use]
    pub fn add_energy(self, energy: f64) -> Self {
        let t = self.sum + energy;
        let compensation = if self.sum.abs() >= energy.abs() {
            self.compensation + ((self.sum - t) + energy)
        } else {
            self.compensation + ((energy - t) + self.sum)
        };
        Self {
            sum: t,
            compensation,
            count: self.count + 1,
        }
    }

    /// Total energy `RE_t`.
    pub fn total(&self) -> f64 {
        self.sum + self.compensation
    }

    /// Number of accumulated energies (`m + t`).
    pub fn count(&self) -> usize {
        self.count
    }

    /// Running mean energy `ε_t`, or `None` before the first update.
    pub fn mean_energy(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.total() / self.count as f64)
        }
    }
}
