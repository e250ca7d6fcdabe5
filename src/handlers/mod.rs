//! HTTP Request Handlers
//!
//! Thin layer over the services, organized by resource.

pub mod health;
pub mod leaderboard;
pub mod submissions;

use axum::Router;

use crate::state::AppState;

/// Create all API routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .nest("/submissions", submissions::routes())
        .nest("/events", leaderboard::routes())
}
