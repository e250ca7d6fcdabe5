//! Leaderboard model

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Participant;
use crate::constants::FULL_SCORE;

/// Leaderboard entry database model
///
/// Exactly one of `user_id` and `team_id` is set.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub total_score: f64,
    pub problems_solved: i32,
    pub last_submission: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl LeaderboardEntry {
    /// A fresh, empty entry for `participant`
    pub fn empty(event_id: Uuid, participant: Participant) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id: participant.user_id(),
            team_id: participant.team_id(),
            total_score: 0.0,
            problems_solved: 0,
            last_submission: None,
            updated_at: Utc::now(),
        }
    }

    /// Overwrite the aggregates with a recomputed standing.
    ///
    /// `last_submission` is the triggering submission; without one the
    /// stored value is kept, falling back to the newest judged submission.
    pub fn apply(&mut self, standing: Standing, last_submission: Option<DateTime<Utc>>) {
        self.total_score = standing.total_score;
        self.problems_solved = standing.problems_solved;
        self.last_submission = last_submission
            .or(self.last_submission)
            .or(standing.latest);
        self.updated_at = Utc::now();
    }

    /// `None` only for rows violating the user/team exclusivity check
    pub fn participant(&self) -> Option<Participant> {
        match (self.user_id, self.team_id) {
            (None, Some(team)) => Some(Participant::Team(team)),
            (Some(user), None) => Some(Participant::User(user)),
            _ => None,
        }
    }
}

/// A judged submission reduced to what the leaderboard needs
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub problem_id: Uuid,
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

/// Entry with its position in the event ranking
#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub rank: u32,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

/// Aggregate standing of one participant in one event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standing {
    pub total_score: f64,
    pub problems_solved: i32,
    /// Newest judged submission in the history
    pub latest: Option<DateTime<Utc>>,
}

impl Standing {
    /// Rebuild from every judged submission of the participant: keep the best
    /// score per problem, sum the bests and count the full marks.
    pub fn from_history(history: &[ScoreRecord]) -> Self {
        let mut best: HashMap<Uuid, f64> = HashMap::new();
        for record in history {
            best.entry(record.problem_id)
                .and_modify(|s| *s = s.max(record.score))
                .or_insert(record.score);
        }

        let total_score = best.values().sum::<f64>();
        Self {
            total_score: (total_score * 100.0).round() / 100.0,
            problems_solved: best.values().filter(|s| **s >= FULL_SCORE).count() as i32,
            latest: history.iter().map(|r| r.submitted_at).max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(problem_id: Uuid, score: f64) -> ScoreRecord {
        ScoreRecord {
            problem_id,
            score,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_best_score_per_problem_counts() {
        let p = Uuid::new_v4();
        let standing = Standing::from_history(&[record(p, 40.0), record(p, 90.0), record(p, 10.0)]);
        assert_eq!(standing.total_score, 90.0);
        assert_eq!(standing.problems_solved, 0);
    }

    #[test]
    fn test_sums_across_problems_and_counts_solved() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let standing = Standing::from_history(&[
            record(a, 100.0),
            record(b, 33.33),
            record(b, 66.67),
            record(c, 0.0),
            record(a, 50.0),
        ]);
        assert_eq!(standing.total_score, 166.67);
        assert_eq!(standing.problems_solved, 1);
    }

    #[test]
    fn test_rebuild_is_idempotent_and_order_independent() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut history = vec![record(a, 75.0), record(b, 100.0), record(a, 20.0)];
        let first = Standing::from_history(&history);
        history.reverse();
        assert_eq!(Standing::from_history(&history), first);
        assert_eq!(Standing::from_history(&history), first);
    }

    #[test]
    fn test_empty_history() {
        let standing = Standing::from_history(&[]);
        assert_eq!(standing.total_score, 0.0);
        assert_eq!(standing.problems_solved, 0);
        assert!(standing.latest.is_none());
    }
}
