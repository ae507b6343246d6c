//! Spatial-rank EWMA (SREWMA) control chart for multivariate mean shifts.
//!
//! # Algorithm
//!
//! Starting from `m` in-control reference observations, each monitored
//! observation `x_t` (t = 1, 2, ...) goes through:
//!
//! ```text
//! 1. M_t   = whitening transform of the reference set (before x_t)
//! 2. z_i   = M_t x_i for every stored observation, z_t = M_t x_t
//! 3. r_t   = spatial rank of z_t against all z_i
//! 4. ε_t   = (RE_0 + Σ_{k≤t} ‖r_k‖²) / (m + t)
//! 5. append x_t to the reference set
//! 6. v_t   = (1 - λ) v_{t-1} + λ r_t,   v_0 = 0
//! 7. Q_t   = (2 - λ) p / (λ ε_t) · ‖v_t‖²
//! 8. signal when Q_t > UCL
//! ```
//!
//! No distributional assumption is made beyond the observations being
//! exchangeable while in control; heavy tails and skewness do not inflate
//! the false-alarm rate the way they do for Hotelling-type charts.
//!
//! # State machine
//!
//! [`SrewmaChart::initialize`] builds a chart in [`ChartStatus::Monitoring`].
//! The first processed step moves it to `InControl` or `Signaled`.
//! `Signaled` is sticky: the chart keeps producing statistics but never
//! resets itself.
//!
//! # Reference
//!
//! Zou, C., Wang, Z. & Tsung, F. (2012). "A spatial rank-based multivariate
//! EWMA control chart", *Naval Research Logistics* 59(2), pp. 91-104.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::energy::EnergyAccumulator;
use super::ewma::EwmaVector;
use crate::config::SrewmaConfig;
use crate::error::{InputSite, ReferenceDefect, SrewmaError};
use crate::rank::{leave_one_out_ranks, spatial_rank, RankVector};
use crate::reference::ReferenceSet;
use crate::whitening::{WhiteningError, WhiteningTransform};

/// Lifecycle of a monitoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartStatus {
    /// Initialized, no observation processed yet.
    Monitoring,
    /// Every statistic so far stayed at or below the control limit.
    InControl,
    /// The control limit was exceeded; `first_signal` is the 1-based step.
    Signaled { first_signal: usize },
}

/// Output of one monitoring step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SrewmaStep {
    /// 1-based step index `t`.
    pub step: usize,
    /// Chart statistic `Q_t`.
    pub statistic: f64,
    /// Running mean energy `ε_t`.
    pub mean_energy: f64,
    /// Energy `‖r_t‖²` of this step's rank.
    pub rank_energy: f64,
    /// Whether `Q_t` exceeds the control limit at this step.
    pub signal: bool,
    /// Chart status after this step.
    pub status: ChartStatus,
}

/// First fatal failure of a [`SrewmaChart::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepFailure {
    /// 0-based position of the offending observation in the stream.
    pub index: usize,
    /// 1-based chart step the observation would have become.
    pub step: usize,
    /// What went wrong.
    pub error: SrewmaError,
    /// The observation that could not be processed.
    pub observation: Vec<f64>,
    /// Statistic of the last successful step, if any.
    pub last_statistic: Option<f64>,
}

/// Result of processing a stream of observations.
#[derive(Debug, Clone, PartialEq)]
pub struct SrewmaRun {
    /// Successful steps, in order.
    pub steps: Vec<SrewmaStep>,
    /// Step of the first signal, if the chart has signaled.
    pub first_signal: Option<usize>,
    /// Chart status when the run ended.
    pub status: ChartStatus,
    /// Set when the run stopped early.
    pub failure: Option<StepFailure>,
}

impl SrewmaRun {
    /// Ordered sequence of `Q_t` values.
    pub fn statistics(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.statistic).collect()
    }

    /// Run length: the step of the first signal.
    pub fn run_length(&self) -> Option<usize> {
        self.first_signal
    }

    /// Whether every observation of the stream was processed.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// SREWMA statistic `Q = (2 - λ) p / (λ ε) · ‖v‖²`.
///
/// Returns 0 when `mean_energy` is not positive; that only happens when
/// every rank so far was the zero vector, in which case `v` is zero too.
pub fn monitoring_statistic(ewma: &EwmaVector, mean_energy: f64) -> f64 {
    if mean_energy <= 0.0 {
        return 0.0;
    }
    let scale = ewma.dim() as f64 / (ewma.asymptotic_variance_factor() * mean_energy);
    scale * ewma.norm_squared()
}

/// SREWMA chart state: expanding reference set, energy total and EWMA vector.
///
/// # Examples
///
/// ```
/// use u_srewma::config::SrewmaConfig;
/// use u_srewma::detection::{ChartStatus, SrewmaChart};
///
/// let reference = [[1.0, 0.0], [-1.0, 0.0], [0.0, 1.0], [0.0, -1.0], [0.0, 0.0]];
/// let config = SrewmaConfig::new(0.1, 10.0).unwrap();
/// let mut chart = SrewmaChart::initialize(&reference, config).unwrap();
///
/// let run = chart.run([[0.1, 0.05], [-0.05, 0.1], [0.05, -0.1]]);
/// assert_eq!(run.statistics().len(), 3);
/// assert_eq!(run.status, ChartStatus::InControl);
/// assert_eq!(chart.reference_len(), 8);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SrewmaChart {
    config: SrewmaConfig,
    reference: ReferenceSet,
    reference_size: usize,
    energy: EnergyAccumulator,
    ewma: EwmaVector,
    step: usize,
    status: ChartStatus,
    last_statistic: Option<f64>,
}

impl SrewmaChart {
    /// Builds a chart from an in-control reference sample.
    ///
    /// The dimension `p` is taken from the first row. `RE_0` is the sum of
    /// leave-one-out rank energies of the whitened reference sample.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for an out-of-range configuration.
    /// - `InsufficientReferenceSize` for fewer than `p + 1` rows, a
    ///   non-finite value or a rank-deficient sample.
    /// - `DimensionMismatch` for a ragged row.
    pub fn initialize<R: AsRef<[f64]>>(
        reference_sample: &[R],
        config: SrewmaConfig,
    ) -> Result<Self, SrewmaError> {
        config.validate()?;
        let reference = ReferenceSet::from_rows(reference_sample)?;
        let dim = reference.dim();

        let transform = WhiteningTransform::estimate(&reference, config.singular_tolerance)
            .map_err(|e| match e {
                WhiteningError::TooFew { required, actual } => {
                    ReferenceDefect::TooFew { required, actual }
                }
                WhiteningError::Singular {
                    pivot_ratio,
                    tolerance,
                } => ReferenceDefect::RankDeficient {
                    pivot_ratio,
                    tolerance,
                },
            })?;
        let ranks = leave_one_out_ranks(&transform.whiten(&reference))?;
        let energy = EnergyAccumulator::from_ranks(&ranks);

        let ewma = EwmaVector::new(dim, config.lambda).ok_or(SrewmaError::InvalidParameter {
            name: "lambda",
            value: config.lambda,
        })?;

        info!(
            dim,
            reference_size = reference.len(),
            initial_energy = energy.total(),
            lambda = config.lambda,
            control_limit = config.control_limit,
            "SREWMA chart initialized"
        );

        Ok(Self {
            config,
            reference_size: reference.len(),
            reference,
            energy,
            ewma,
            step: 0,
            status: ChartStatus::Monitoring,
            last_statistic: None,
        })
    }

    /// Processes the next observation of the monitoring stream.
    ///
    /// All fallible work (validation, whitening, ranking) happens before the
    /// chart is touched, so an error leaves the chart exactly as it was and
    /// the caller may skip the observation or stop.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if the observation does not have `p` features.
    /// - `NonFiniteInput` for NaN or infinite features.
    /// - `SingularCovariance` if the current reference set cannot be whitened;
    ///   this is fatal for continuing the run.
    ///
    /// # Complexity
    ///
    /// Time: O(n p² + p³) with `n = m + t - 1` stored observations.
    pub fn process_next(&mut self, observation: &[f64]) -> Result<SrewmaStep, SrewmaError> {
        let step = self.step + 1;
        let site = InputSite::Monitoring { step };
        self.reference.validate(observation, site)?;

        let transform = WhiteningTransform::estimate(&self.reference, self.config.singular_tolerance)
            .map_err(|e| self.step_whitening_error(step, e))?;
        let context = transform.whiten(&self.reference);
        let rank = spatial_rank(&transform.apply(observation), context.points())?;

        self.commit(step, observation, &rank)
    }

    /// Applies a computed rank to the chart state. Infallible past validation.
    fn commit(
        &mut self,
        step: usize,
        observation: &[f64],
        rank: &RankVector,
    ) -> Result<SrewmaStep, SrewmaError> {
        // Already validated against this dimension in process_next.
        self.reference
            .push(observation, InputSite::Monitoring { step })?;

        let rank_energy = rank.norm_squared();
        self.energy = self.energy.update(rank);
        self.ewma = self.ewma.step(rank);
        self.step = step;

        let mean_energy = self.energy.mean_energy().unwrap_or(0.0);
        let statistic = monitoring_statistic(&self.ewma, mean_energy);
        let signal = statistic > self.config.control_limit;

        self.status = match self.status {
            ChartStatus::Signaled { first_signal } => ChartStatus::Signaled { first_signal },
            _ if signal => {
                warn!(
                    step,
                    statistic,
                    control_limit = self.config.control_limit,
                    "SREWMA control limit exceeded"
                );
                ChartStatus::Signaled { first_signal: step }
            }
            _ => ChartStatus::InControl,
        };
        self.last_statistic = Some(statistic);

        debug!(step, statistic, mean_energy, rank_energy, signal, "SREWMA step");

        Ok(SrewmaStep {
            step,
            statistic,
            mean_energy,
            rank_energy,
            signal,
            status: self.status,
        })
    }

    fn step_whitening_error(&self, step: usize, error: WhiteningError) -> SrewmaError {
        match error {
            WhiteningError::Singular {
                pivot_ratio,
                tolerance,
            } => {
                warn!(
                    step,
                    pivot_ratio,
                    tolerance,
                    reference_len = self.reference.len(),
                    "singular covariance, run cannot continue"
                );
                SrewmaError::SingularCovariance {
                    step,
                    pivot_ratio,
                    tolerance,
                    last_statistic: self.last_statistic,
                }
            }
            WhiteningError::TooFew { required, actual } => {
                ReferenceDefect::TooFew { required, actual }.into()
            }
        }
    }

    /// Processes a whole stream, stopping at the first fatal failure.
    ///
    /// Signals do not stop the run; the full `Q_t` sequence is produced.
    pub fn run<I, O>(&mut self, stream: I) -> SrewmaRun
    where
        I: IntoIterator<Item = O>,
        O: AsRef<[f64]>,
    {
        let mut steps = Vec::new();
        let mut failure = None;

        for (index, observation) in stream.into_iter().enumerate() {
            let observation = observation.as_ref();
            match self.process_next(observation) {
                Ok(step) => steps.push(step),
                Err(error) => {
                    warn!(index, step = self.step + 1, %error, "SREWMA run stopped");
                    failure = Some(StepFailure {
                        index,
                        step: self.step + 1,
                        error,
                        observation: observation.to_vec(),
                        last_statistic: self.last_statistic,
                    });
                    break;
                }
            }
        }

        SrewmaRun {
            steps,
            first_signal: self.first_signal(),
            status: self.status,
            failure,
        }
    }

    /// Chart configuration.
    pub fn config(&self) -> &SrewmaConfig {
        &self.config
    }

    /// Dimension `p`.
    pub fn dim(&self) -> usize {
        self.reference.dim()
    }

    /// Number of monitored observations processed (`t`).
    pub fn step(&self) -> usize {
        self.step
    }

    /// Current status.
    pub fn status(&self) -> ChartStatus {
        self.status
    }

    /// Step of the first signal, if any.
    pub fn first_signal(&self) -> Option<usize> {
        match self.status {
            ChartStatus::Signaled { first_signal } => Some(first_signal),
            _ => None,
        }
    }

    /// Size `m` of the initial reference sample.
    pub fn reference_size(&self) -> usize {
        self.reference_size
    }

    /// Current reference set size, `m + t`.
    pub fn reference_len(&self) -> usize {
        self.reference.len()
    }

    /// The expanding reference set.
    pub fn reference(&self) -> &ReferenceSet {
        &self.reference
    }

    /// Running energy total.
    pub fn energy(&self) -> &EnergyAccumulator {
        &self.energy
    }

    /// Current EWMA vector `v_t`.
    pub fn ewma(&self) -> &EwmaVector {
        &self.ewma
    }

    /// Statistic of the last processed step.
    pub fn last_statistic(&self) -> Option<f64> {
        self.last_statistic
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn statistic_nonnegative_and_reference_grows(
            reference in proptest::collection::vec(
                proptest::collection::vec(-10.0_f64..10.0, 2),
                6..=12,
            ),
            stream in proptest::collection::vec(
                proptest::collection::vec(-20.0_f64..20.0, 2),
                1..=15,
            ),
            lambda in 0.02_f64..0.5,
        ) {
            let config = SrewmaConfig::new(lambda, 15.0).expect("valid params");
            // Random references can be numerically singular; skip those draws.
            if let Ok(mut chart) = SrewmaChart::initialize(&reference, config) {
                let m = chart.reference_size();
                let run = chart.run(&stream);
                let k = run.steps.len();
                prop_assert_eq!(chart.reference_len(), m + k);
                prop_assert_eq!(chart.step(), k);
                for s in &run.steps {
                    prop_assert!(s.statistic.is_finite() && s.statistic >= 0.0,
                        "Q_{} = {}", s.step, s.statistic);
                    prop_assert!(s.rank_energy <= 1.0 + 1e-12);
                    prop_assert!(s.mean_energy > 0.0);
                }
            }
        }
    }
}
