//! Filtering statistics.
//!
//! Rejection rates are computed per filtering step from its candidate counts and aggregated over
//! the steps matching a [FilteringStatsQuery]. Steps without candidates are counted but take no
//! part in the rate statistics.
//!
//! The steps and counts come from two collaborators, [StepFinder] and [CandidateCounter], which
//! are implemented by the [Store](crate::store::Store).

use crate::error::XRayError;
use crate::models::{FilteringStats, FilteringStatsQuery, Step};

use rayon::prelude::*;
use uuid::Uuid;

/// Source of filtering steps.
pub trait StepFinder {
    /// Returns the steps of type "filter" that satisfy the query filters.
    fn find_filter_steps(&self, query: &FilteringStatsQuery) -> Result<Vec<Step>, XRayError>;
}

/// Source of per-step candidate counts.
pub trait CandidateCounter {
    /// Returns the number of candidates recorded for a step.
    fn count_candidates(&self, step_id: Uuid) -> Result<u64, XRayError>;

    /// Returns the number of selected candidates recorded for a step.
    fn count_selected_candidates(&self, step_id: Uuid) -> Result<u64, XRayError>;
}

/// Candidate counts of a single step.
#[derive(Clone, Copy, Debug, PartialEq)]
struct StepCounts {
    total: u64,
    selected: u64,
}

impl StepCounts {
    /// Fetch the counts of a step.
    ///
    /// The selected count must be read before the total. Both only grow and every insert adds to
    /// them together, so a candidate inserted between the two reads can raise the total but never
    /// leave it below the selected count read earlier.
    fn fetch<C: CandidateCounter + ?Sized>(counter: &C, step: &Step) -> Result<Self, XRayError> {
        let selected = counter.count_selected_candidates(step.step_id)?;
        let total = counter.count_candidates(step.step_id)?;
        if selected > total {
            return Err(XRayError::CandidateCountMismatch {
                step_id: step.step_id,
                total,
                selected,
            });
        }
        Ok(Self { total, selected })
    }

    /// Returns the fraction of candidates that were rejected, or `None` for a step without
    /// candidates.
    fn rejection_rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some((self.total - self.selected) as f64 / self.total as f64)
        }
    }
}

/// Running totals over the matched steps.
#[derive(Debug, Default)]
struct RejectionAccumulator {
    /// All matched steps
    steps: u64,
    input: u64,
    output: u64,
    /// Rejection rate of each contributing step
    rates: Vec<f64>,
    min: f64,
    max: f64,
}

impl RejectionAccumulator {
    fn add(mut self, counts: StepCounts) -> Self {
        self.steps += 1;
        if let Some(rate) = counts.rejection_rate() {
            if self.rates.is_empty() {
                self.min = rate;
                self.max = rate;
            } else {
                self.min = self.min.min(rate);
                self.max = self.max.max(rate);
            }
            self.rates.push(rate);
            self.input += counts.total;
            self.output += counts.selected;
        }
        self
    }

    fn finish(mut self) -> FilteringStats {
        let contributing = self.rates.len();
        let average = if contributing == 0 {
            0.0
        } else {
            // Summed in sorted order so that the result does not depend on step order.
            self.rates.sort_by(f64::total_cmp);
            self.rates.iter().sum::<f64>() / contributing as f64
        };
        FilteringStats {
            total_filtering_steps: self.steps,
            total_input_candidates: self.input,
            total_output_candidates: self.output,
            average_rejection_rate: average,
            min_rejection_rate: self.min,
            max_rejection_rate: self.max,
        }
    }
}

/// Aggregate per-step counts into [FilteringStats].
fn aggregate(counts: impl IntoIterator<Item = StepCounts>) -> FilteringStats {
    counts
        .into_iter()
        .fold(RejectionAccumulator::default(), RejectionAccumulator::add)
        .finish()
}

/// Compute filtering statistics.
///
/// Candidate counts are fetched one step at a time. Any collaborator failure fails the whole
/// computation.
///
/// # Arguments
///
/// * `finder`: Source of the matching filtering steps
/// * `counter`: Source of per-step candidate counts
/// * `query`: Pipeline type and date filters
#[tracing::instrument(level = "DEBUG", skip(finder, counter))]
pub fn filtering_stats<F, C>(
    finder: &F,
    counter: &C,
    query: &FilteringStatsQuery,
) -> Result<FilteringStats, XRayError>
where
    F: StepFinder + ?Sized,
    C: CandidateCounter + ?Sized,
{
    let steps = finder.find_filter_steps(query)?;
    if steps.is_empty() {
        return Ok(FilteringStats::default());
    }
    let counts = steps
        .iter()
        .map(|step| StepCounts::fetch(counter, step))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!("aggregating {} filtering steps", counts.len());
    Ok(aggregate(counts))
}

/// Compute filtering statistics, fetching candidate counts on the Rayon thread pool.
///
/// All fetches complete before aggregation and the result is identical to [filtering_stats].
///
/// # Arguments
///
/// * `finder`: Source of the matching filtering steps
/// * `counter`: Source of per-step candidate counts
/// * `query`: Pipeline type and date filters
#[tracing::instrument(level = "DEBUG", skip(finder, counter))]
pub fn filtering_stats_par<F, C>(
    finder: &F,
    counter: &C,
    query: &FilteringStatsQuery,
) -> Result<FilteringStats, XRayError>
where
    F: StepFinder + ?Sized,
    C: CandidateCounter + Sync + ?Sized,
{
    let steps = finder.find_filter_steps(query)?;
    if steps.is_empty() {
        return Ok(FilteringStats::default());
    }
    let counts = steps
        .par_iter()
        .map(|step| StepCounts::fetch(counter, step))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!("aggregating {} filtering steps", counts.len());
    Ok(aggregate(counts))
}
