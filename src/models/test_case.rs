//! Test case model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Test case database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub input: String,
    /// Absent when the case only checks that the program runs cleanly
    pub expected_output: Option<String>,
    /// Relative weight in the score, always positive
    pub weight: i32,
    pub is_sample: bool,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

/// Sum of the weights of a problem's test cases
pub fn total_weight(cases: &[TestCase]) -> i64 {
    cases.iter().map(|c| i64::from(c.weight)).sum()
}
