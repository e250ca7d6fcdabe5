//! Recovery of orphaned submissions
//!
//! A worker that crashes or is killed mid-job leaves its submission
//! `running` forever, and a queue hiccup can leave one `queued` without a
//! job. The sweeper runs on a fixed interval: stale `running` submissions
//! are forced to `runtime_error`, stale `queued` ones are pushed again.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::JobQueue;
use crate::{config::GradingConfig, db::SharedStore, error::AppResult};

/// What one sweep changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub orphaned: usize,
    pub requeued: usize,
}

pub struct RecoverySweeper {
    store: SharedStore,
    queue: Arc<dyn JobQueue>,
    config: GradingConfig,
}

impl RecoverySweeper {
    pub fn new(store: SharedStore, queue: Arc<dyn JobQueue>, config: GradingConfig) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    pub async fn sweep_once(&self) -> AppResult<SweepReport> {
        let now = Utc::now();
        let mut report = SweepReport::default();

        let running_cutoff = now - Duration::seconds(self.config.stale_running_secs);
        for id in self.store.stale_running(running_cutoff).await? {
            let reason = format!(
                "No grading progress for {}s; the worker was lost",
                self.config.stale_running_secs
            );
            if self.store.force_runtime_error(id, &reason).await? {
                tracing::warn!(submission_id = %id, "Orphaned submission marked runtime_error");
                report.orphaned += 1;
            }
        }

        let queued_cutoff = now - Duration::seconds(self.config.stale_queued_secs);
        for id in self.store.stale_queued(queued_cutoff).await? {
            self.queue.push(id).await?;
            tracing::info!(submission_id = %id, "Stale queued submission re-enqueued");
            report.requeued += 1;
        }

        Ok(report)
    }

    /// Sweep on the configured interval until `shutdown` flips
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.sweep_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = interval.tick() => {}
                }

                match self.sweep_once().await {
                    Ok(report) if report != SweepReport::default() => {
                        tracing::info!(
                            orphaned = report.orphaned,
                            requeued = report.requeued,
                            "Recovery sweep finished"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Recovery sweep failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use uuid::Uuid;

    use super::*;
    use crate::{
        db::{MemoryStore, SubmissionStore},
        execution::{ExecutionBackend, ExecutionError, ExecutionOutcome, ExecutionRequest},
        models::SubmissionStatus,
        services::GradingService,
        test_utils::{new_submission, problem_with_cases},
        worker::MemoryJobQueue,
    };

    /// Accepts every case after a fixed delay
    struct SlowBackend(StdDuration);

    #[async_trait::async_trait]
    impl ExecutionBackend for SlowBackend {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn execute(&self, _request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutionError> {
            tokio::time::sleep(self.0).await;
            Ok(ExecutionOutcome::with_status(SubmissionStatus::Accepted))
        }
    }

    #[tokio::test]
    async fn test_sweep_repairs_orphans_and_requeues() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryJobQueue::new());
        let (problem, cases) = problem_with_cases(&[1]);
        store.insert_problem(problem.clone(), cases).await;

        let orphan = store
            .create_submission(&new_submission(&problem, Uuid::new_v4(), None), 0)
            .await
            .unwrap();
        store.claim(orphan.id).await.unwrap();
        let mut aged = store.find_submission(orphan.id).await.unwrap().unwrap();
        aged.started_at = Some(Utc::now() - Duration::hours(1));
        aged.heartbeat_at = aged.started_at;
        store.put_submission(aged).await;

        let mut stuck = store
            .create_submission(&new_submission(&problem, Uuid::new_v4(), None), 0)
            .await
            .unwrap();
        stuck.submitted_at = Utc::now() - Duration::hours(1);
        store.put_submission(stuck.clone()).await;

        let fresh = store
            .create_submission(&new_submission(&problem, Uuid::new_v4(), None), 0)
            .await
            .unwrap();

        let sweeper = RecoverySweeper::new(store.clone(), queue.clone(), GradingConfig::default());
        let report = sweeper.sweep_once().await.unwrap();

        assert_eq!(report, SweepReport { orphaned: 1, requeued: 1 });
        let orphan = store.find_submission(orphan.id).await.unwrap().unwrap();
        assert_eq!(orphan.status(), SubmissionStatus::RuntimeError);
        assert_eq!(
            queue.pop(StdDuration::from_millis(10)).await.unwrap(),
            Some(stuck.id)
        );
        assert_eq!(queue.pop(StdDuration::from_millis(10)).await.unwrap(), None);

        let fresh = store.find_submission(fresh.id).await.unwrap().unwrap();
        assert_eq!(fresh.status(), SubmissionStatus::Queued);
    }

    #[tokio::test]
    async fn test_sweep_spares_submission_that_is_still_grading() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryJobQueue::new());
        let (problem, cases) = problem_with_cases(&[1, 1, 1, 1, 1, 1]);
        store.insert_problem(problem.clone(), cases).await;
        let submission = store
            .create_submission(&new_submission(&problem, Uuid::new_v4(), None), 0)
            .await
            .unwrap();

        let grader = GradingService::new(
            store.clone(),
            Arc::new(SlowBackend(StdDuration::from_millis(300))),
        );
        let id = submission.id;
        let grading = tokio::spawn(async move { grader.grade(id).await });

        // Past the stale window measured from the claim, but not from the last finished case
        tokio::time::sleep(StdDuration::from_millis(1450)).await;
        let config = GradingConfig {
            stale_running_secs: 1,
            ..GradingConfig::default()
        };
        let report = RecoverySweeper::new(store.clone(), queue, config)
            .sweep_once()
            .await
            .unwrap();
        assert_eq!(report.orphaned, 0);

        let judgement = grading.await.unwrap().unwrap().unwrap();
        assert_eq!(judgement.status, SubmissionStatus::Accepted);
        let stored = store.find_submission(id).await.unwrap().unwrap();
        assert_eq!(stored.status(), SubmissionStatus::Accepted);
        assert_eq!(stored.score, 100.0);
    }
}
