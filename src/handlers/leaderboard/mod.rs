//! Leaderboard handlers

mod handler;
pub mod response;

pub use handler::*;
pub use response::*;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Leaderboard routes, nested under an event
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{event_id}/leaderboard", get(handler::get_leaderboard))
        .route("/{event_id}/leaderboard/rebuild", post(handler::rebuild_leaderboard))
}
