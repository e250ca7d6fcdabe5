//! Postgres-backed store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{
    repositories::{LeaderboardRepository, ProblemRepository, SubmissionRepository},
    store::{LeaderboardStore, ProblemStore, SubmissionStore},
};
use crate::{
    constants::statuses,
    error::{AppError, AppResult},
    models::{
        Judgement, LeaderboardEntry, NewSubmission, Participant, Problem, Standing, Submission,
        TestCase, TestCaseOutcome,
    },
    utils::cooldown_remaining,
};

/// Store implementation on a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Recompute a participant's entry on an open transaction
async fn rebuild_in(
    conn: &mut PgConnection,
    event_id: Uuid,
    participant: Participant,
    last_submission: Option<DateTime<Utc>>,
) -> AppResult<LeaderboardEntry> {
    LeaderboardRepository::lock_participant(&mut *conn, &event_id, participant).await?;
    let history = LeaderboardRepository::judged_history(&mut *conn, &event_id, participant).await?;
    let standing = Standing::from_history(&history);
    LeaderboardRepository::upsert(&mut *conn, &event_id, participant, &standing, last_submission)
        .await
}

#[async_trait]
impl ProblemStore for PgStore {
    async fn find_problem(&self, id: Uuid) -> AppResult<Option<Problem>> {
        ProblemRepository::find_by_id(&self.pool, &id).await
    }

    async fn test_cases(&self, problem_id: Uuid) -> AppResult<Vec<TestCase>> {
        ProblemRepository::get_test_cases(&self.pool, &problem_id).await
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn create_submission(
        &self,
        new: &NewSubmission,
        cooldown_secs: i64,
    ) -> AppResult<Submission> {
        let mut tx = self.pool.begin().await?;

        if cooldown_secs > 0 {
            let participant = new.participant();
            SubmissionRepository::lock_intake(&mut tx, participant, &new.problem_id).await?;
            let last =
                SubmissionRepository::latest_submitted_at(&mut *tx, participant, &new.problem_id)
                    .await?;
            if let Some(wait) = last.and_then(|t| cooldown_remaining(t, cooldown_secs, Utc::now())) {
                tx.rollback().await?;
                return Err(AppError::TooManyRequests(wait));
            }
        }

        let submission = SubmissionRepository::create(&mut *tx, new).await?;
        tx.commit().await?;
        Ok(submission)
    }

    async fn find_submission(&self, id: Uuid) -> AppResult<Option<Submission>> {
        SubmissionRepository::find_by_id(&self.pool, &id).await
    }

    async fn claim(&self, id: Uuid) -> AppResult<Option<Submission>> {
        SubmissionRepository::claim(&self.pool, &id).await
    }

    async fn heartbeat(&self, id: Uuid) -> AppResult<bool> {
        SubmissionRepository::heartbeat(&self.pool, &id).await
    }

    async fn commit_judgement(&self, judgement: &Judgement) -> AppResult<Option<LeaderboardEntry>> {
        let mut tx = self.pool.begin().await?;

        let Some(submission) = SubmissionRepository::finalize(&mut *tx, judgement).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        for outcome in &judgement.outcomes {
            SubmissionRepository::insert_outcome(&mut *tx, outcome).await?;
        }

        let entry = rebuild_in(
            &mut tx,
            submission.event_id,
            submission.participant(),
            Some(submission.submitted_at),
        )
        .await?;

        tx.commit().await?;
        Ok(Some(entry))
    }

    async fn force_runtime_error(&self, id: Uuid, reason: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let Some(submission) =
            SubmissionRepository::force_runtime_error(&mut *tx, &id, reason).await?
        else {
            tx.rollback().await?;
            return Ok(false);
        };

        rebuild_in(
            &mut tx,
            submission.event_id,
            submission.participant(),
            Some(submission.submitted_at),
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn outcomes(&self, submission_id: Uuid) -> AppResult<Vec<TestCaseOutcome>> {
        SubmissionRepository::get_outcomes(&self.pool, &submission_id).await
    }

    async fn stale_running(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        SubmissionRepository::find_stale(&self.pool, statuses::RUNNING, cutoff).await
    }

    async fn stale_queued(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        SubmissionRepository::find_stale(&self.pool, statuses::QUEUED, cutoff).await
    }
}

#[async_trait]
impl LeaderboardStore for PgStore {
    async fn entries(&self, event_id: Uuid) -> AppResult<Vec<LeaderboardEntry>> {
        LeaderboardRepository::list_by_event(&self.pool, &event_id).await
    }

    async fn judged_participants(&self, event_id: Uuid) -> AppResult<Vec<Participant>> {
        LeaderboardRepository::judged_participants(&self.pool, &event_id).await
    }

    async fn rebuild_entry(
        &self,
        event_id: Uuid,
        participant: Participant,
        last_submission: Option<DateTime<Utc>>,
    ) -> AppResult<LeaderboardEntry> {
        let mut tx = self.pool.begin().await?;
        let entry = rebuild_in(&mut tx, event_id, participant, last_submission).await?;
        tx.commit().await?;
        Ok(entry)
    }
}
