//! Submission handler implementations

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    middleware::Actor,
    models::Submission,
    state::AppState,
};

use super::{
    request::CreateSubmissionRequest,
    response::{CreateSubmissionResponse, SubmissionResponse, SubmissionResultsResponse},
};

/// Create a new submission
pub async fn create_submission(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateSubmissionRequest>,
) -> AppResult<(StatusCode, Json<CreateSubmissionResponse>)> {
    payload.validate()?;

    let submission = state
        .submissions()
        .submit(payload.into_new_submission(actor))
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateSubmissionResponse {
            id: submission.id,
            status: submission.status,
            message: "Submission received and queued for judging".to_string(),
        }),
    ))
}

/// Get submission status by ID
pub async fn get_submission(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SubmissionResponse>> {
    let submission = state.submissions().get(id).await?;
    ensure_visible(&actor, &submission)?;
    Ok(Json(submission.into()))
}

/// Get per-test-case results
pub async fn get_submission_results(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SubmissionResultsResponse>> {
    let (submission, outcomes) = state.submissions().detail(id).await?;
    ensure_visible(&actor, &submission)?;
    Ok(Json(SubmissionResultsResponse::new(submission, outcomes)))
}

/// The author and their team may read a submission; anyone else sees 404
fn ensure_visible(actor: &Actor, submission: &Submission) -> AppResult<()> {
    let same_team = actor.team_id.is_some() && actor.team_id == submission.team_id;
    if submission.user_id == actor.user_id || same_team {
        Ok(())
    } else {
        Err(AppError::NotFound("Submission not found".to_string()))
    }
}
