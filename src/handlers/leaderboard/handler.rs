//! Leaderboard handler implementations

use axum::{
    Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::Actor,
    state::AppState,
};

use super::response::{LeaderboardQuery, LeaderboardResponse, RebuildResponse};

/// Ranked standings of an event
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Query(query): Query<LeaderboardQuery>,
) -> AppResult<Json<LeaderboardResponse>> {
    let page = state
        .leaderboard()
        .ranking(event_id, query.page, query.page_size)
        .await?;
    Ok(Json(LeaderboardResponse::new(event_id, page)))
}

/// Recompute every entry of an event from submission history; admins only
pub async fn rebuild_leaderboard(
    State(state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<Uuid>,
) -> AppResult<Json<RebuildResponse>> {
    if !state.is_admin(actor.user_id) {
        tracing::warn!(%event_id, user_id = %actor.user_id, "Leaderboard rebuild denied");
        return Err(AppError::Forbidden(
            "leaderboard rebuild requires an administrator".to_string(),
        ));
    }
    tracing::info!(%event_id, requested_by = %actor.user_id, "Leaderboard rebuild requested");
    let rebuilt = state.leaderboard().rebuild_event(event_id).await?;
    Ok(Json(RebuildResponse { event_id, rebuilt }))
}
