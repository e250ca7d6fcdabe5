//! Leaderboard response DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{models::RankedEntry, services::LeaderboardPage};

/// Leaderboard query parameters
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub event_id: Uuid,
    pub entries: Vec<RankedEntry>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

impl LeaderboardResponse {
    pub fn new(event_id: Uuid, page: LeaderboardPage) -> Self {
        Self {
            event_id,
            entries: page.entries,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub event_id: Uuid,
    pub rebuilt: usize,
}
