//! Submission repository

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use super::{participant_filter, participant_id};
use crate::{
    constants::statuses,
    error::AppResult,
    models::{Judgement, NewSubmission, Participant, Submission, TestCaseOutcome},
};

/// Repository for submission database operations
pub struct SubmissionRepository;

impl SubmissionRepository {
    /// Create a new queued submission
    pub async fn create<'e>(db: impl PgExecutor<'e>, new: &NewSubmission) -> AppResult<Submission> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (event_id, problem_id, user_id, team_id, language, source_code, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.event_id)
        .bind(new.problem_id)
        .bind(new.user_id)
        .bind(new.team_id)
        .bind(&new.language)
        .bind(&new.source_code)
        .bind(statuses::QUEUED)
        .fetch_one(db)
        .await?;

        Ok(submission)
    }

    /// Find submission by ID
    pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: &Uuid) -> AppResult<Option<Submission>> {
        let submission =
            sqlx::query_as::<_, Submission>(r#"SELECT * FROM submissions WHERE id = $1"#)
                .bind(id)
                .fetch_optional(db)
                .await?;

        Ok(submission)
    }

    /// Serialize intake for one participant and problem until the
    /// surrounding transaction ends
    pub async fn lock_intake(
        conn: &mut PgConnection,
        participant: Participant,
        problem_id: &Uuid,
    ) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("intake:{}:{}", problem_id, participant))
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Most recent submission time of a participant for a problem
    pub async fn latest_submitted_at<'e>(
        db: impl PgExecutor<'e>,
        participant: Participant,
        problem_id: &Uuid,
    ) -> AppResult<Option<DateTime<Utc>>> {
        let sql = format!(
            "SELECT MAX(submitted_at) FROM submissions WHERE problem_id = $1 AND {}",
            participant_filter(participant, 2)
        );
        let latest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(&sql)
            .bind(problem_id)
            .bind(participant_id(participant))
            .fetch_one(db)
            .await?;

        Ok(latest)
    }

    /// Claim a queued submission for grading
    pub async fn claim<'e>(db: impl PgExecutor<'e>, id: &Uuid) -> AppResult<Option<Submission>> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions
            SET status = $2, started_at = NOW(), heartbeat_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(statuses::RUNNING)
        .bind(statuses::QUEUED)
        .fetch_optional(db)
        .await?;

        Ok(submission)
    }

    /// Mark a running submission as still being graded
    pub async fn heartbeat<'e>(db: impl PgExecutor<'e>, id: &Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"UPDATE submissions SET heartbeat_at = NOW() WHERE id = $1 AND status = $2"#,
        )
        .bind(id)
        .bind(statuses::RUNNING)
        .execute(db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Write the terminal result of a running submission
    pub async fn finalize<'e>(
        db: impl PgExecutor<'e>,
        judgement: &Judgement,
    ) -> AppResult<Option<Submission>> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions
            SET
                status = $2,
                score = $3,
                execution_time_ms = $4,
                memory_used_kb = $5,
                judged_at = $6
            WHERE id = $1 AND status = $7
            RETURNING *
            "#,
        )
        .bind(judgement.submission_id)
        .bind(judgement.status.as_str())
        .bind(judgement.score)
        .bind(judgement.execution_time_ms)
        .bind(judgement.memory_used_kb)
        .bind(judgement.judged_at)
        .bind(statuses::RUNNING)
        .fetch_optional(db)
        .await?;

        Ok(submission)
    }

    /// Force a non-terminal submission to runtime_error
    pub async fn force_runtime_error<'e>(
        db: impl PgExecutor<'e>,
        id: &Uuid,
        reason: &str,
    ) -> AppResult<Option<Submission>> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions
            SET status = $2, score = 0, error_message = $3, judged_at = NOW()
            WHERE id = $1 AND status IN ($4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(statuses::RUNTIME_ERROR)
        .bind(reason)
        .bind(statuses::QUEUED)
        .bind(statuses::RUNNING)
        .fetch_optional(db)
        .await?;

        Ok(submission)
    }

    /// Store the outcome of one test case
    pub async fn insert_outcome<'e>(
        db: impl PgExecutor<'e>,
        outcome: &TestCaseOutcome,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO test_case_outcomes
                (submission_id, test_case_id, order_index, weight, status, passed,
                 stdout, stderr, compile_output, execution_time_ms, memory_used_kb, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(outcome.submission_id)
        .bind(outcome.test_case_id)
        .bind(outcome.order_index)
        .bind(outcome.weight)
        .bind(&outcome.status)
        .bind(outcome.passed)
        .bind(&outcome.stdout)
        .bind(&outcome.stderr)
        .bind(&outcome.compile_output)
        .bind(outcome.execution_time_ms)
        .bind(outcome.memory_used_kb)
        .bind(outcome.created_at)
        .execute(db)
        .await?;

        Ok(())
    }

    /// Outcomes of a submission in test case order
    pub async fn get_outcomes<'e>(
        db: impl PgExecutor<'e>,
        submission_id: &Uuid,
    ) -> AppResult<Vec<TestCaseOutcome>> {
        let outcomes = sqlx::query_as::<_, TestCaseOutcome>(
            r#"SELECT * FROM test_case_outcomes WHERE submission_id = $1 ORDER BY order_index"#,
        )
        .bind(submission_id)
        .fetch_all(db)
        .await?;

        Ok(outcomes)
    }

    /// IDs of submissions in `status` whose reference time is before `cutoff`
    pub async fn find_stale<'e>(
        db: impl PgExecutor<'e>,
        status: &str,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM submissions
            WHERE status = $1 AND COALESCE(heartbeat_at, started_at, submitted_at) < $2
            ORDER BY submitted_at
            "#,
        )
        .bind(status)
        .bind(cutoff)
        .fetch_all(db)
        .await?;

        Ok(ids)
    }
}
