//! Submission model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::constants::statuses;

/// Submission database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub event_id: Uuid,
    pub problem_id: Uuid,
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
    pub language: String,
    #[serde(skip_serializing)]
    pub source_code: String,
    pub status: String,
    pub score: f64,
    pub execution_time_ms: Option<i64>,
    pub memory_used_kb: Option<i64>,
    /// Set when grading itself failed
    pub error_message: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    /// Refreshed by the grader after every test case
    #[serde(skip_serializing)]
    pub heartbeat_at: Option<DateTime<Utc>>,
    pub judged_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Typed status; unknown strings are treated as a runtime error
    pub fn status(&self) -> SubmissionStatus {
        SubmissionStatus::parse(&self.status).unwrap_or(SubmissionStatus::RuntimeError)
    }

    /// The leaderboard identity this submission counts towards
    pub fn participant(&self) -> Participant {
        Participant::of(self.user_id, self.team_id)
    }
}

/// Data needed to create a submission
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub event_id: Uuid,
    pub problem_id: Uuid,
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
    pub language: String,
    pub source_code: String,
}

impl NewSubmission {
    pub fn participant(&self) -> Participant {
        Participant::of(self.user_id, self.team_id)
    }
}

/// Judging status of a submission or of one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Queued,
    Running,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    CompileError,
    RuntimeError,
}

impl SubmissionStatus {
    /// Get status as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => statuses::QUEUED,
            Self::Running => statuses::RUNNING,
            Self::Accepted => statuses::ACCEPTED,
            Self::WrongAnswer => statuses::WRONG_ANSWER,
            Self::TimeLimitExceeded => statuses::TIME_LIMIT_EXCEEDED,
            Self::MemoryLimitExceeded => statuses::MEMORY_LIMIT_EXCEEDED,
            Self::CompileError => statuses::COMPILE_ERROR,
            Self::RuntimeError => statuses::RUNTIME_ERROR,
        }
    }

    /// Parse status from its stored form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            statuses::QUEUED => Some(Self::Queued),
            statuses::RUNNING => Some(Self::Running),
            statuses::ACCEPTED => Some(Self::Accepted),
            statuses::WRONG_ANSWER => Some(Self::WrongAnswer),
            statuses::TIME_LIMIT_EXCEEDED => Some(Self::TimeLimitExceeded),
            statuses::MEMORY_LIMIT_EXCEEDED => Some(Self::MemoryLimitExceeded),
            statuses::COMPILE_ERROR => Some(Self::CompileError),
            statuses::RUNTIME_ERROR => Some(Self::RuntimeError),
            _ => None,
        }
    }

    /// Check if judging is complete
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Running)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A leaderboard identity: a team when the submission was made in a team
/// context, otherwise the individual user. Never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Participant {
    User(Uuid),
    Team(Uuid),
}

impl Participant {
    pub fn of(user_id: Uuid, team_id: Option<Uuid>) -> Self {
        match team_id {
            Some(team) => Self::Team(team),
            None => Self::User(user_id),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::User(id) => Some(*id),
            Self::Team(_) => None,
        }
    }

    pub fn team_id(&self) -> Option<Uuid> {
        match self {
            Self::Team(id) => Some(*id),
            Self::User(_) => None,
        }
    }

    /// Whether `submission` belongs to this participant's history
    pub fn owns(&self, submission: &Submission) -> bool {
        submission.participant() == *self
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{}", id),
            Self::Team(id) => write!(f, "team:{}", id),
        }
    }
}
