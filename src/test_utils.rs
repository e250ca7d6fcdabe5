//! Fixtures shared by unit tests

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::GradingConfig,
    constants::languages,
    db::MemoryStore,
    models::{NewSubmission, Problem, TestCase},
    services::{LeaderboardService, SubmissionService},
    state::AppState,
    worker::MemoryJobQueue,
};

/// A fresh problem in a fresh event with one test case per weight
pub fn problem_with_cases(weights: &[i32]) -> (Problem, Vec<TestCase>) {
    let problem = Problem {
        id: Uuid::new_v4(),
        event_id: Uuid::new_v4(),
        title: "A + B".to_string(),
        time_limit_ms: 1000,
        memory_limit_kb: 65_536,
        allowed_languages: languages::DEFAULT_ALLOWED
            .iter()
            .map(|l| l.to_string())
            .collect(),
        created_at: Utc::now(),
    };

    let cases = weights
        .iter()
        .enumerate()
        .map(|(i, &weight)| TestCase {
            id: Uuid::new_v4(),
            problem_id: problem.id,
            input: format!("{} {}\n", i, i + 1),
            expected_output: Some(format!("{}\n", 2 * i + 1)),
            weight,
            is_sample: i == 0,
            order_index: i as i32,
            created_at: Utc::now(),
        })
        .collect();

    (problem, cases)
}

/// A python submission to `problem`
pub fn new_submission(problem: &Problem, user_id: Uuid, team_id: Option<Uuid>) -> NewSubmission {
    NewSubmission {
        event_id: problem.event_id,
        problem_id: problem.id,
        user_id,
        team_id,
        language: "python".to_string(),
        source_code: "a, b = map(int, input().split())\nprint(a + b)\n".to_string(),
    }
}

/// The one user `app_state` treats as an administrator
pub const ADMIN_ID: Uuid = Uuid::from_u128(0xad31);

/// Handler state over an in-memory store and queue
pub fn app_state(store: Arc<MemoryStore>) -> (AppState, Arc<MemoryJobQueue>) {
    let queue = Arc::new(MemoryJobQueue::new());
    let submissions = SubmissionService::new(store.clone(), queue.clone(), GradingConfig::default());
    let leaderboard = LeaderboardService::new(store);
    (AppState::new(submissions, leaderboard, "mock", vec![ADMIN_ID]), queue)
}
