//! Submission request DTOs

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{constants::MAX_SOURCE_CODE_SIZE, middleware::Actor, models::NewSubmission};

/// `validator` length bounds are `u64`; same value as `MAX_SOURCE_CODE_SIZE`.
const MAX_SOURCE_CODE_LEN: u64 = MAX_SOURCE_CODE_SIZE as u64;

/// Create submission request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    pub event_id: Uuid,

    pub problem_id: Uuid,

    /// Programming language
    #[validate(length(min = 1, max = 20))]
    pub language: String,

    /// Source code
    #[validate(length(min = 1, max = MAX_SOURCE_CODE_LEN))]
    pub source_code: String,
}

impl CreateSubmissionRequest {
    pub fn into_new_submission(self, actor: Actor) -> NewSubmission {
        NewSubmission {
            event_id: self.event_id,
            problem_id: self.problem_id,
            user_id: actor.user_id,
            team_id: actor.team_id,
            language: self.language,
            source_code: self.source_code,
        }
    }
}
