//! In-process store
//!
//! Used by tests and when the service runs without a database. A single lock
//! guards all state, so every operation is atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::{LeaderboardStore, ProblemStore, SubmissionStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        Judgement, LeaderboardEntry, NewSubmission, Participant, Problem, ScoreRecord, Standing,
        Submission, SubmissionStatus, TestCase, TestCaseOutcome,
    },
    utils::cooldown_remaining,
};

#[derive(Default)]
struct MemoryState {
    problems: HashMap<Uuid, Problem>,
    test_cases: HashMap<Uuid, Vec<TestCase>>,
    submissions: HashMap<Uuid, Submission>,
    outcomes: HashMap<Uuid, Vec<TestCaseOutcome>>,
    entries: HashMap<(Uuid, Participant), LeaderboardEntry>,
}

impl MemoryState {
    fn rebuild(
        &mut self,
        event_id: Uuid,
        participant: Participant,
        last_submission: Option<DateTime<Utc>>,
    ) -> LeaderboardEntry {
        let history: Vec<ScoreRecord> = self
            .submissions
            .values()
            .filter(|s| s.event_id == event_id && participant.owns(s) && s.status().is_terminal())
            .map(|s| ScoreRecord {
                problem_id: s.problem_id,
                score: s.score,
                submitted_at: s.submitted_at,
            })
            .collect();
        let standing = Standing::from_history(&history);

        let entry = self
            .entries
            .entry((event_id, participant))
            .or_insert_with(|| LeaderboardEntry::empty(event_id, participant));
        entry.apply(standing, last_submission);
        entry.clone()
    }
}

/// Store keeping everything in memory
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a problem with its test cases
    pub async fn insert_problem(&self, problem: Problem, mut test_cases: Vec<TestCase>) {
        test_cases.sort_by_key(|c| c.order_index);
        let mut state = self.state.lock().await;
        state.test_cases.insert(problem.id, test_cases);
        state.problems.insert(problem.id, problem);
    }

    /// Overwrite a stored submission
    #[cfg(test)]
    pub async fn put_submission(&self, submission: Submission) {
        self.state
            .lock()
            .await
            .submissions
            .insert(submission.id, submission);
    }
}

#[async_trait]
impl ProblemStore for MemoryStore {
    async fn find_problem(&self, id: Uuid) -> AppResult<Option<Problem>> {
        Ok(self.state.lock().await.problems.get(&id).cloned())
    }

    async fn test_cases(&self, problem_id: Uuid) -> AppResult<Vec<TestCase>> {
        Ok(self
            .state
            .lock()
            .await
            .test_cases
            .get(&problem_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn create_submission(
        &self,
        new: &NewSubmission,
        cooldown_secs: i64,
    ) -> AppResult<Submission> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        if cooldown_secs > 0 {
            let participant = new.participant();
            let last = state
                .submissions
                .values()
                .filter(|s| s.problem_id == new.problem_id && participant.owns(s))
                .map(|s| s.submitted_at)
                .max();
            if let Some(wait) = last.and_then(|t| cooldown_remaining(t, cooldown_secs, now)) {
                return Err(AppError::TooManyRequests(wait));
            }
        }

        let submission = Submission {
            id: Uuid::new_v4(),
            event_id: new.event_id,
            problem_id: new.problem_id,
            user_id: new.user_id,
            team_id: new.team_id,
            language: new.language.clone(),
            source_code: new.source_code.clone(),
            status: SubmissionStatus::Queued.as_str().to_string(),
            score: 0.0,
            execution_time_ms: None,
            memory_used_kb: None,
            error_message: None,
            submitted_at: now,
            started_at: None,
            heartbeat_at: None,
            judged_at: None,
        };
        state.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn find_submission(&self, id: Uuid) -> AppResult<Option<Submission>> {
        Ok(self.state.lock().await.submissions.get(&id).cloned())
    }

    async fn claim(&self, id: Uuid) -> AppResult<Option<Submission>> {
        let mut state = self.state.lock().await;
        match state.submissions.get_mut(&id) {
            Some(s) if s.status() == SubmissionStatus::Queued => {
                let now = Utc::now();
                s.status = SubmissionStatus::Running.as_str().to_string();
                s.started_at = Some(now);
                s.heartbeat_at = Some(now);
                Ok(Some(s.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn heartbeat(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.submissions.get_mut(&id) {
            Some(s) if s.status() == SubmissionStatus::Running => {
                s.heartbeat_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit_judgement(&self, judgement: &Judgement) -> AppResult<Option<LeaderboardEntry>> {
        let mut state = self.state.lock().await;

        let submission = match state.submissions.get_mut(&judgement.submission_id) {
            Some(s) if s.status() == SubmissionStatus::Running => {
                s.status = judgement.status.as_str().to_string();
                s.score = judgement.score;
                s.execution_time_ms = Some(judgement.execution_time_ms);
                s.memory_used_kb = Some(judgement.memory_used_kb);
                s.judged_at = Some(judgement.judged_at);
                s.clone()
            }
            _ => return Ok(None),
        };

        state
            .outcomes
            .insert(submission.id, judgement.outcomes.clone());

        let entry = state.rebuild(
            submission.event_id,
            submission.participant(),
            Some(submission.submitted_at),
        );
        Ok(Some(entry))
    }

    async fn force_runtime_error(&self, id: Uuid, reason: &str) -> AppResult<bool> {
        let mut state = self.state.lock().await;

        let submission = match state.submissions.get_mut(&id) {
            Some(s) if !s.status().is_terminal() => {
                s.status = SubmissionStatus::RuntimeError.as_str().to_string();
                s.score = 0.0;
                s.error_message = Some(reason.to_string());
                s.judged_at = Some(Utc::now());
                s.clone()
            }
            _ => return Ok(false),
        };

        state.rebuild(
            submission.event_id,
            submission.participant(),
            Some(submission.submitted_at),
        );
        Ok(true)
    }

    async fn outcomes(&self, submission_id: Uuid) -> AppResult<Vec<TestCaseOutcome>> {
        let mut outcomes = self
            .state
            .lock()
            .await
            .outcomes
            .get(&submission_id)
            .cloned()
            .unwrap_or_default();
        outcomes.sort_by_key(|o| o.order_index);
        Ok(outcomes)
    }

    async fn stale_running(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        Ok(self
            .state
            .lock()
            .await
            .submissions
            .values()
            .filter(|s| {
                s.status() == SubmissionStatus::Running
                    && s.heartbeat_at.or(s.started_at).unwrap_or(s.submitted_at) < cutoff
            })
            .map(|s| s.id)
            .collect())
    }

    async fn stale_queued(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        Ok(self
            .state
            .lock()
            .await
            .submissions
            .values()
            .filter(|s| s.status() == SubmissionStatus::Queued && s.submitted_at < cutoff)
            .map(|s| s.id)
            .collect())
    }
}

#[async_trait]
impl LeaderboardStore for MemoryStore {
    async fn entries(&self, event_id: Uuid) -> AppResult<Vec<LeaderboardEntry>> {
        Ok(self
            .state
            .lock()
            .await
            .entries
            .values()
            .filter(|e| e.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn judged_participants(&self, event_id: Uuid) -> AppResult<Vec<Participant>> {
        let state = self.state.lock().await;
        let mut participants: Vec<Participant> = state
            .submissions
            .values()
            .filter(|s| s.event_id == event_id && s.status().is_terminal())
            .map(|s| s.participant())
            .collect();
        participants.sort_by_key(|p| p.to_string());
        participants.dedup();
        Ok(participants)
    }

    async fn rebuild_entry(
        &self,
        event_id: Uuid,
        participant: Participant,
        last_submission: Option<DateTime<Utc>>,
    ) -> AppResult<LeaderboardEntry> {
        Ok(self
            .state
            .lock()
            .await
            .rebuild(event_id, participant, last_submission))
    }
}
