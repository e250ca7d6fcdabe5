//! Score aggregation
//!
//! Folds per-test-case outcomes into a weighted score and one terminal
//! status. Weights are accumulated as integers, so the score only depends on
//! which cases passed and grows with that set.

use crate::{
    constants::{FULL_SCORE, PARTIAL_SCORE_CAP},
    execution::ExecutionOutcome,
    models::SubmissionStatus,
};

/// Whether grading should go on after a test case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// A compile error makes the remaining cases pointless
    Halt,
}

/// Final figures of a graded submission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeSummary {
    pub status: SubmissionStatus,
    pub score: f64,
    pub max_time_ms: i64,
    pub max_memory_kb: i64,
}

/// Running aggregate over a submission's test cases
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    total_weight: i64,
    passed_weight: i64,
    recorded_weight: i64,
    first_failure: Option<SubmissionStatus>,
    compile_failed: bool,
    max_time_ms: i64,
    max_memory_kb: i64,
}

impl ScoreAggregator {
    pub fn new(total_weight: i64) -> Self {
        Self {
            total_weight,
            passed_weight: 0,
            recorded_weight: 0,
            first_failure: None,
            compile_failed: false,
            max_time_ms: 0,
            max_memory_kb: 0,
        }
    }

    /// Fold in the outcome of one test case of the given weight
    pub fn record(&mut self, weight: i32, outcome: &ExecutionOutcome) -> Flow {
        let weight = i64::from(weight.max(0));
        self.recorded_weight += weight;
        self.max_time_ms = self.max_time_ms.max(outcome.time_ms);
        self.max_memory_kb = self.max_memory_kb.max(outcome.memory_kb);

        if outcome.passed {
            self.passed_weight += weight;
            return Flow::Continue;
        }

        if outcome.status == SubmissionStatus::CompileError {
            self.compile_failed = true;
            return Flow::Halt;
        }

        if self.first_failure.is_none() {
            // A backend should never report a failing case as still pending
            let status = if outcome.status.is_terminal() && !outcome.status.is_accepted() {
                outcome.status
            } else {
                SubmissionStatus::RuntimeError
            };
            self.first_failure = Some(status);
        }
        Flow::Continue
    }

    /// Weight of the cases folded in so far
    pub fn recorded_weight(&self) -> i64 {
        self.recorded_weight
    }

    pub fn score(&self) -> f64 {
        weighted_score(self.passed_weight, self.total_weight)
    }

    pub fn finish(&self) -> GradeSummary {
        let status = if self.compile_failed {
            SubmissionStatus::CompileError
        } else {
            self.first_failure.unwrap_or(SubmissionStatus::Accepted)
        };

        GradeSummary {
            status,
            score: self.score(),
            max_time_ms: self.max_time_ms,
            max_memory_kb: self.max_memory_kb,
        }
    }
}

/// Percentage of `total` covered by `passed`, rounded to two decimals.
///
/// Only a full sweep scores 100; a partial one is capped just below it even
/// when rounding would reach 100. No weight at all counts as a full sweep.
pub fn weighted_score(passed: i64, total: i64) -> f64 {
    if total <= 0 || passed >= total {
        return FULL_SCORE;
    }
    let raw = passed as f64 / total as f64 * FULL_SCORE;
    let rounded = (raw * 100.0).round() / 100.0;
    rounded.min(PARTIAL_SCORE_CAP)
}
