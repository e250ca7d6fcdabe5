//! Submission response DTOs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Submission, TestCaseOutcome};

/// Returned when a submission has been accepted for grading
#[derive(Debug, Serialize)]
pub struct CreateSubmissionResponse {
    pub id: Uuid,
    pub status: String,
    pub message: String,
}

/// Submission status and summary
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub problem_id: Uuid,
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
    pub language: String,
    pub status: String,
    pub score: f64,
    pub execution_time_ms: Option<i64>,
    pub memory_used_kb: Option<i64>,
    pub error_message: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub judged_at: Option<DateTime<Utc>>,
}

impl From<Submission> for SubmissionResponse {
    fn from(s: Submission) -> Self {
        Self {
            id: s.id,
            event_id: s.event_id,
            problem_id: s.problem_id,
            user_id: s.user_id,
            team_id: s.team_id,
            language: s.language,
            status: s.status,
            score: s.score,
            execution_time_ms: s.execution_time_ms,
            memory_used_kb: s.memory_used_kb,
            error_message: s.error_message,
            submitted_at: s.submitted_at,
            judged_at: s.judged_at,
        }
    }
}

/// Per-test-case results of a submission
#[derive(Debug, Serialize)]
pub struct SubmissionResultsResponse {
    pub submission_id: Uuid,
    pub status: String,
    pub score: f64,
    pub compile_output: Option<String>,
    pub test_results: Vec<TestCaseResult>,
}

/// Result for a single test case
#[derive(Debug, Serialize)]
pub struct TestCaseResult {
    pub test_case_id: Uuid,
    pub order_index: i32,
    pub weight: i32,
    pub status: String,
    pub passed: bool,
    pub execution_time_ms: i64,
    pub memory_used_kb: i64,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl SubmissionResultsResponse {
    pub fn new(submission: Submission, outcomes: Vec<TestCaseOutcome>) -> Self {
        // A compile failure ends grading, so at most one outcome carries it
        let compile_output = outcomes.iter().find_map(|o| o.compile_output.clone());
        Self {
            submission_id: submission.id,
            status: submission.status,
            score: submission.score,
            compile_output,
            test_results: outcomes
                .into_iter()
                .map(|o| TestCaseResult {
                    test_case_id: o.test_case_id,
                    order_index: o.order_index,
                    weight: o.weight,
                    status: o.status,
                    passed: o.passed,
                    execution_time_ms: o.execution_time_ms,
                    memory_used_kb: o.memory_used_kb,
                    stdout: o.stdout,
                    stderr: o.stderr,
                })
                .collect(),
        }
    }
}
