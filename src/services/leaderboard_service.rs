//! Leaderboard updater and ranking
//!
//! Entries are recomputed from full submission history rather than patched
//! incrementally, so running an update twice gives the same entry. The
//! per-submission update happens inside [`SubmissionStore::commit_judgement`];
//! this service covers on-demand recomputation and reads.
//!
//! [`SubmissionStore::commit_judgement`]: crate::db::SubmissionStore::commit_judgement

use std::cmp::Ordering;

use uuid::Uuid;

use crate::{
    db::SharedStore,
    error::AppResult,
    models::{LeaderboardEntry, RankedEntry},
    utils::clamp_page,
};

/// One page of an event ranking
#[derive(Debug, Clone)]
pub struct LeaderboardPage {
    pub entries: Vec<RankedEntry>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Clone)]
pub struct LeaderboardService {
    store: SharedStore,
}

impl LeaderboardService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Recompute every entry of an event; returns how many were rebuilt
    pub async fn rebuild_event(&self, event_id: Uuid) -> AppResult<usize> {
        let participants = self.store.judged_participants(event_id).await?;
        for participant in &participants {
            self.store.rebuild_entry(event_id, *participant, None).await?;
        }
        tracing::info!(%event_id, entries = participants.len(), "Leaderboard rebuilt");
        Ok(participants.len())
    }

    /// Ranked, paginated view of an event (pages start at 1)
    pub async fn ranking(
        &self,
        event_id: Uuid,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> AppResult<LeaderboardPage> {
        let (page, page_size) = clamp_page(page, page_size);

        let ranked = rank(self.store.entries(event_id).await?);
        let total = ranked.len();
        // Saturates for absurd pages, which then come back empty
        let offset = (page as usize - 1).saturating_mul(page_size as usize);
        let entries = ranked
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .collect();

        Ok(LeaderboardPage {
            entries,
            total,
            page,
            page_size,
        })
    }
}

/// Order by score (desc), solved count (desc), then earliest last
/// submission; entries without one sort last. Ranks are 1-based positions.
pub fn rank(mut entries: Vec<LeaderboardEntry>) -> Vec<RankedEntry> {
    entries.sort_by(compare_entries);
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| RankedEntry {
            rank: i as u32 + 1,
            entry,
        })
        .collect()
}

fn compare_entries(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.total_score
        .total_cmp(&a.total_score)
        .then_with(|| b.problems_solved.cmp(&a.problems_solved))
        .then_with(|| match (a.last_submission, b.last_submission) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
