//! Grading job queue
//!
//! Jobs are bare submission ids. The submission row is the source of truth
//! for job state, so a lost or duplicated id is harmless: duplicates fail to
//! claim and lost ones are re-queued by the recovery sweeper.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::{constants::JUDGE_QUEUE_KEY, error::AppResult};

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn push(&self, submission_id: Uuid) -> AppResult<()>;

    /// Wait up to `wait` for the next job
    async fn pop(&self, wait: Duration) -> AppResult<Option<Uuid>>;
}

/// Redis list queue (LPUSH / BRPOP)
pub struct RedisJobQueue {
    client: redis::Client,
    conn: ConnectionManager,
}

impl RedisJobQueue {
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        Ok(Self { client, conn })
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn push(&self, submission_id: Uuid) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(JUDGE_QUEUE_KEY, submission_id.to_string())
            .await?;
        Ok(())
    }

    async fn pop(&self, wait: Duration) -> AppResult<Option<Uuid>> {
        // BRPOP blocks its connection, so each pop gets its own instead of
        // stalling the shared manager
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let popped: Option<(String, String)> =
            conn.brpop(JUDGE_QUEUE_KEY, wait.as_secs_f64()).await?;

        match popped {
            Some((_, raw)) => match Uuid::parse_str(&raw) {
                Ok(id) => Ok(Some(id)),
                Err(_) => {
                    tracing::error!("Invalid submission ID in queue: {}", raw);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}

/// In-process FIFO queue
#[derive(Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<VecDeque<Uuid>>,
    ready: Notify,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn push(&self, submission_id: Uuid) -> AppResult<()> {
        self.jobs.lock().await.push_back(submission_id);
        self.ready.notify_one();
        Ok(())
    }

    async fn pop(&self, wait: Duration) -> AppResult<Option<Uuid>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            if let Some(id) = self.jobs.lock().await.pop_front() {
                return Ok(Some(id));
            }
            if tokio::time::timeout_at(deadline, self.ready.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_memory_queue_is_fifo() {
        let queue = MemoryJobQueue::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        queue.push(a).await.unwrap();
        queue.push(b).await.unwrap();

        assert_eq!(queue.pop(Duration::from_millis(10)).await.unwrap(), Some(a));
        assert_eq!(queue.pop(Duration::from_millis(10)).await.unwrap(), Some(b));
        assert_eq!(queue.pop(Duration::from_millis(10)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_queue_wakes_waiting_consumer() {
        let queue = Arc::new(MemoryJobQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let id = Uuid::new_v4();
        queue.push(id).await.unwrap();

        assert_eq!(consumer.await.unwrap().unwrap(), Some(id));
    }
}
