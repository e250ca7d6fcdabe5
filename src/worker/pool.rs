//! Worker pool draining the job queue

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::JobQueue;
use crate::{constants::QUEUE_POP_TIMEOUT_SECS, services::GradingService};

/// Pause after a queue error before polling again
const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// A fixed set of tasks each grading one submission at a time
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl WorkerPool {
    pub fn spawn(count: usize, queue: Arc<dyn JobQueue>, grader: GradingService) -> Self {
        let (shutdown, signal) = watch::channel(false);
        let handles = (0..count)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    Arc::clone(&queue),
                    grader.clone(),
                    signal.clone(),
                ))
            })
            .collect();

        tracing::info!(workers = count, "Grading workers started");
        Self { handles, shutdown }
    }

    /// A receiver that flips to `true` when the pool shuts down
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Stop taking new jobs and wait for in-flight ones to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                tracing::error!("Worker task ended abnormally: {}", e);
            }
        }
        tracing::info!("Grading workers stopped");
    }
}

async fn run_worker(
    worker: usize,
    queue: Arc<dyn JobQueue>,
    grader: GradingService,
    mut shutdown: watch::Receiver<bool>,
) {
    let wait = Duration::from_secs_f64(QUEUE_POP_TIMEOUT_SECS);
    tracing::debug!(worker, "Worker started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let popped = tokio::select! {
            _ = shutdown.changed() => break,
            popped = queue.pop(wait) => popped,
        };

        let submission_id = match popped {
            Ok(Some(id)) => id,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(worker, error = %e, "Queue unavailable");
                tokio::time::sleep(QUEUE_ERROR_BACKOFF).await;
                continue;
            }
        };

        // Job failures are already recorded on the submission
        if let Err(e) = grader.grade(submission_id).await {
            tracing::error!(worker, %submission_id, error = %e, "Job failed");
        }
    }

    tracing::debug!(worker, "Worker stopped");
}
