//! Leaderboard repository

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use super::{participant_filter, participant_id};
use crate::{
    error::AppResult,
    models::{LeaderboardEntry, Participant, ScoreRecord, Standing},
};

/// Repository for leaderboard database operations
pub struct LeaderboardRepository;

impl LeaderboardRepository {
    /// Serialize leaderboard writes for one participant until the
    /// surrounding transaction ends
    pub async fn lock_participant(
        conn: &mut PgConnection,
        event_id: &Uuid,
        participant: Participant,
    ) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("leaderboard:{}:{}", event_id, participant))
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Scores of all judged submissions of a participant in an event
    pub async fn judged_history<'e>(
        db: impl PgExecutor<'e>,
        event_id: &Uuid,
        participant: Participant,
    ) -> AppResult<Vec<ScoreRecord>> {
        let sql = format!(
            r#"
            SELECT problem_id, score, submitted_at FROM submissions
            WHERE event_id = $1 AND {} AND status NOT IN ('queued', 'running')
            "#,
            participant_filter(participant, 2)
        );
        let history = sqlx::query_as::<_, ScoreRecord>(&sql)
            .bind(event_id)
            .bind(participant_id(participant))
            .fetch_all(db)
            .await?;

        Ok(history)
    }

    /// Insert or update a participant's entry with a recomputed standing
    pub async fn upsert<'e>(
        db: impl PgExecutor<'e>,
        event_id: &Uuid,
        participant: Participant,
        standing: &Standing,
        last_submission: Option<DateTime<Utc>>,
    ) -> AppResult<LeaderboardEntry> {
        let conflict_target = match participant {
            Participant::User(_) => "(event_id, user_id) WHERE team_id IS NULL",
            Participant::Team(_) => "(event_id, team_id) WHERE user_id IS NULL",
        };
        let sql = format!(
            r#"
            INSERT INTO leaderboard_entries
                (event_id, user_id, team_id, total_score, problems_solved, last_submission)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, $7))
            ON CONFLICT {}
            DO UPDATE SET
                total_score = EXCLUDED.total_score,
                problems_solved = EXCLUDED.problems_solved,
                last_submission = COALESCE($6, leaderboard_entries.last_submission, $7),
                updated_at = NOW()
            RETURNING *
            "#,
            conflict_target
        );

        let entry = sqlx::query_as::<_, LeaderboardEntry>(&sql)
            .bind(event_id)
            .bind(participant.user_id())
            .bind(participant.team_id())
            .bind(standing.total_score)
            .bind(standing.problems_solved)
            .bind(last_submission)
            .bind(standing.latest)
            .fetch_one(db)
            .await?;

        Ok(entry)
    }

    /// All entries of an event
    pub async fn list_by_event<'e>(
        db: impl PgExecutor<'e>,
        event_id: &Uuid,
    ) -> AppResult<Vec<LeaderboardEntry>> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r#"SELECT * FROM leaderboard_entries WHERE event_id = $1"#,
        )
        .bind(event_id)
        .fetch_all(db)
        .await?;

        Ok(entries)
    }

    /// Distinct participants with judged submissions in an event
    pub async fn judged_participants<'e>(
        db: impl PgExecutor<'e>,
        event_id: &Uuid,
    ) -> AppResult<Vec<Participant>> {
        let rows = sqlx::query_as::<_, (Uuid, Option<Uuid>)>(
            r#"
            SELECT DISTINCT user_id, team_id FROM submissions
            WHERE event_id = $1 AND status NOT IN ('queued', 'running')
            "#,
        )
        .bind(event_id)
        .fetch_all(db)
        .await?;

        let mut participants: Vec<Participant> = rows
            .into_iter()
            .map(|(user_id, team_id)| Participant::of(user_id, team_id))
            .collect();
        participants.sort_by_key(|p| p.to_string());
        participants.dedup();

        Ok(participants)
    }
}
