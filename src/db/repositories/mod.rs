//! Database repositories
//!
//! Repositories handle all direct database interactions. Functions take any
//! Postgres executor so they can run on the pool or inside a transaction.

pub mod leaderboard_repo;
pub mod problem_repo;
pub mod submission_repo;

pub use leaderboard_repo::LeaderboardRepository;
pub use problem_repo::ProblemRepository;
pub use submission_repo::SubmissionRepository;

use crate::models::Participant;

/// SQL predicate selecting a participant's submissions; binds the id as `$n`
pub(crate) fn participant_filter(participant: Participant, n: usize) -> String {
    match participant {
        Participant::User(_) => format!("user_id = ${} AND team_id IS NULL", n),
        Participant::Team(_) => format!("team_id = ${}", n),
    }
}

pub(crate) fn participant_id(participant: Participant) -> uuid::Uuid {
    match participant {
        Participant::User(id) | Participant::Team(id) => id,
    }
}
