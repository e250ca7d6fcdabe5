//! Application state management
//!
//! Shared state handed to every request handler through Axum's State
//! extractor.

use std::sync::Arc;

use uuid::Uuid;

use crate::services::{LeaderboardService, SubmissionService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct AppStateInner {
    submissions: SubmissionService,
    leaderboard: LeaderboardService,
    /// Name of the execution backend, reported by the health check
    backend: &'static str,
    /// Users allowed to run administrative operations
    admins: Vec<Uuid>,
}

impl AppState {
    pub fn new(
        submissions: SubmissionService,
        leaderboard: LeaderboardService,
        backend: &'static str,
        admins: Vec<Uuid>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                submissions,
                leaderboard,
                backend,
                admins,
            }),
        }
    }

    pub fn submissions(&self) -> &SubmissionService {
        &self.inner.submissions
    }

    pub fn leaderboard(&self) -> &LeaderboardService {
        &self.inner.leaderboard
    }

    pub fn backend(&self) -> &'static str {
        self.inner.backend
    }

    pub fn is_admin(&self, user_id: Uuid) -> bool {
        self.inner.admins.contains(&user_id)
    }
}
