//! Recorded per-test-case outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{constants::MAX_CAPTURED_OUTPUT_LEN, execution::ExecutionOutcome};

use super::{SubmissionStatus, TestCase};

/// Outcome of one test case of one submission, as stored
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestCaseOutcome {
    pub submission_id: Uuid,
    pub test_case_id: Uuid,
    pub order_index: i32,
    pub weight: i32,
    pub status: String,
    pub passed: bool,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub execution_time_ms: i64,
    pub memory_used_kb: i64,
    pub created_at: DateTime<Utc>,
}

impl TestCaseOutcome {
    /// Build the stored row, truncating captured text
    pub fn record(submission_id: Uuid, case: &TestCase, outcome: &ExecutionOutcome) -> Self {
        Self {
            submission_id,
            test_case_id: case.id,
            order_index: case.order_index,
            weight: case.weight,
            status: outcome.status.as_str().to_string(),
            passed: outcome.passed,
            stdout: non_empty(&outcome.stdout),
            stderr: non_empty(&outcome.stderr),
            compile_output: outcome.compile_output.as_deref().and_then(non_empty),
            execution_time_ms: outcome.time_ms,
            memory_used_kb: outcome.memory_kb,
            created_at: Utc::now(),
        }
    }
}

/// Final result of grading one submission, written in one transaction
#[derive(Debug, Clone)]
pub struct Judgement {
    pub submission_id: Uuid,
    pub status: SubmissionStatus,
    pub score: f64,
    pub execution_time_ms: i64,
    pub memory_used_kb: i64,
    pub outcomes: Vec<TestCaseOutcome>,
    pub judged_at: DateTime<Utc>,
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(truncate(text, MAX_CAPTURED_OUTPUT_LEN))
    }
}

/// Cut `text` to at most `max_len` bytes on a char boundary
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...[truncated]");
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(truncate("aé", 2), "a...[truncated]");
    }
}
