//! Storage contracts of the judging pipeline

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Judgement, LeaderboardEntry, NewSubmission, Participant, Problem, Submission, TestCase,
        TestCaseOutcome,
    },
};

/// Read-only access to problems and their test cases
#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn find_problem(&self, id: Uuid) -> AppResult<Option<Problem>>;

    /// Test cases of a problem in `order_index` order
    async fn test_cases(&self, problem_id: Uuid) -> AppResult<Vec<TestCase>>;
}

/// Submission lifecycle storage
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert a new `queued` submission.
    ///
    /// With a positive `cooldown_secs`, fails with `TooManyRequests` when the
    /// same participant submitted to the same problem within the window. The
    /// check and the insert are atomic, so concurrent requests cannot both
    /// pass it.
    async fn create_submission(
        &self,
        new: &NewSubmission,
        cooldown_secs: i64,
    ) -> AppResult<Submission>;

    async fn find_submission(&self, id: Uuid) -> AppResult<Option<Submission>>;

    /// Atomically move a submission from `queued` to `running`.
    ///
    /// Returns `None` when the submission is not `queued` any more, i.e.
    /// another worker owns it or it already finished.
    async fn claim(&self, id: Uuid) -> AppResult<Option<Submission>>;

    /// Refresh the liveness mark of a `running` submission. Returns `false`
    /// when it is no longer `running`.
    async fn heartbeat(&self, id: Uuid) -> AppResult<bool>;

    /// Write the terminal result, the per-case outcomes and the participant's
    /// recomputed leaderboard entry in one transaction.
    ///
    /// Returns `None` without writing anything when the submission is no
    /// longer `running`.
    async fn commit_judgement(&self, judgement: &Judgement) -> AppResult<Option<LeaderboardEntry>>;

    /// Recovery write: force a non-terminal submission to `runtime_error`
    /// with score 0 and refresh the participant's entry. Returns whether a
    /// submission was changed.
    async fn force_runtime_error(&self, id: Uuid, reason: &str) -> AppResult<bool>;

    async fn outcomes(&self, submission_id: Uuid) -> AppResult<Vec<TestCaseOutcome>>;

    /// `running` submissions with no sign of life since `cutoff`
    async fn stale_running(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Uuid>>;

    /// `queued` submissions created before `cutoff`
    async fn stale_queued(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Uuid>>;
}

/// Leaderboard storage
#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// All entries of an event, unordered
    async fn entries(&self, event_id: Uuid) -> AppResult<Vec<LeaderboardEntry>>;

    /// Participants with at least one judged submission in the event
    async fn judged_participants(&self, event_id: Uuid) -> AppResult<Vec<Participant>>;

    /// Recompute one participant's entry from full history, creating it if
    /// needed. `last_submission` is left unchanged when `None`.
    async fn rebuild_entry(
        &self,
        event_id: Uuid,
        participant: Participant,
        last_submission: Option<DateTime<Utc>>,
    ) -> AppResult<LeaderboardEntry>;
}

/// Every store the pipeline needs, behind one handle
pub trait Store: ProblemStore + SubmissionStore + LeaderboardStore {}

impl<T: ProblemStore + SubmissionStore + LeaderboardStore> Store for T {}

pub type SharedStore = Arc<dyn Store>;
