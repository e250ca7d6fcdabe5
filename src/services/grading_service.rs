//! Grading orchestrator
//!
//! Owns the lifecycle of one submission once a worker picks it up:
//! `queued -> running -> terminal`. Test cases run sequentially in order;
//! each one runs in its own task so a panicking or failing backend call only
//! costs that case.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::SharedStore,
    error::{AppError, AppResult},
    execution::{ExecutionBackend, ExecutionOutcome, ExecutionRequest},
    models::{Judgement, Language, Problem, Submission, TestCase, TestCaseOutcome, total_weight},
};

use super::scoring::{Flow, ScoreAggregator};

/// Grades submissions against their problem's test cases
#[derive(Clone)]
pub struct GradingService {
    store: SharedStore,
    backend: Arc<dyn ExecutionBackend>,
}

impl GradingService {
    pub fn new(store: SharedStore, backend: Arc<dyn ExecutionBackend>) -> Self {
        Self { store, backend }
    }

    /// Grade one submission.
    ///
    /// Returns `Ok(None)` when the submission could not be claimed (another
    /// worker owns it or it is already judged) or when its result was
    /// superseded before commit. Any failure escaping the per-case boundary
    /// forces the submission to `runtime_error` and is returned as
    /// [`AppError::Orchestration`].
    pub async fn grade(&self, submission_id: Uuid) -> AppResult<Option<Judgement>> {
        let Some(submission) = self.store.claim(submission_id).await? else {
            tracing::debug!(%submission_id, "Submission not claimable, skipping");
            return Ok(None);
        };

        tracing::info!(
            %submission_id,
            problem_id = %submission.problem_id,
            language = %submission.language,
            backend = self.backend.name(),
            "Grading submission"
        );

        match self.judge(&submission).await {
            Ok(judgement) => Ok(judgement),
            Err(err) => {
                tracing::error!(%submission_id, error = %err, "Grading failed, forcing runtime_error");
                self.recover(submission_id, &err.to_string()).await;
                Err(AppError::Orchestration(err.to_string()))
            }
        }
    }

    async fn judge(&self, submission: &Submission) -> AppResult<Option<Judgement>> {
        let language: Language = submission.language.parse()?;
        let problem = self
            .store
            .find_problem(submission.problem_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("problem {}", submission.problem_id)))?;
        let cases = self.store.test_cases(problem.id).await?;

        let mut aggregator = ScoreAggregator::new(total_weight(&cases));
        let mut outcomes = Vec::with_capacity(cases.len());

        for case in &cases {
            let outcome = self.run_case(submission, &problem, language, case).await;
            tracing::debug!(
                submission_id = %submission.id,
                test_case_id = %case.id,
                status = %outcome.status,
                time_ms = outcome.time_ms,
                "Test case finished"
            );

            outcomes.push(TestCaseOutcome::record(submission.id, case, &outcome));
            if aggregator.record(case.weight, &outcome) == Flow::Halt {
                break;
            }

            // Keeps the recovery sweeper off submissions that are still progressing
            match self.store.heartbeat(submission.id).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(
                        submission_id = %submission.id,
                        "Submission left running state during grading, stopping"
                    );
                    return Ok(None);
                }
                Err(err) => tracing::warn!(
                    submission_id = %submission.id,
                    error = %err,
                    "Heartbeat failed"
                ),
            }
        }

        let summary = aggregator.finish();
        let judgement = Judgement {
            submission_id: submission.id,
            status: summary.status,
            score: summary.score,
            execution_time_ms: summary.max_time_ms,
            memory_used_kb: summary.max_memory_kb,
            outcomes,
            judged_at: Utc::now(),
        };

        match self.store.commit_judgement(&judgement).await? {
            Some(entry) => {
                tracing::info!(
                    submission_id = %submission.id,
                    status = %judgement.status,
                    score = judgement.score,
                    total_score = entry.total_score,
                    problems_solved = entry.problems_solved,
                    "Submission judged"
                );
                Ok(Some(judgement))
            }
            None => {
                tracing::warn!(
                    submission_id = %submission.id,
                    "Submission left running state before commit, result discarded"
                );
                Ok(None)
            }
        }
    }

    /// Run one test case; every failure becomes a `runtime_error` outcome
    async fn run_case(
        &self,
        submission: &Submission,
        problem: &Problem,
        language: Language,
        case: &TestCase,
    ) -> ExecutionOutcome {
        let request = ExecutionRequest {
            source_code: submission.source_code.clone(),
            language,
            stdin: case.input.clone(),
            expected_output: case.expected_output.clone(),
            time_limit: problem.time_limit(),
            memory_limit_kb: problem.memory_limit_kb(),
        };

        let backend = Arc::clone(&self.backend);
        let handle = tokio::spawn(async move { backend.execute(&request).await });

        match handle.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                tracing::warn!(
                    submission_id = %submission.id,
                    test_case_id = %case.id,
                    error = %err,
                    "Backend failed on test case"
                );
                ExecutionOutcome::runtime_error(err.to_string())
            }
            Err(join_err) => {
                tracing::error!(
                    submission_id = %submission.id,
                    test_case_id = %case.id,
                    error = %join_err,
                    "Execution task aborted"
                );
                ExecutionOutcome::runtime_error(format!("execution task failed: {}", join_err))
            }
        }
    }

    /// Separate write path used after the main procedure failed
    async fn recover(&self, submission_id: Uuid, reason: &str) {
        match self.store.force_runtime_error(submission_id, reason).await {
            Ok(true) => tracing::info!(%submission_id, "Submission marked runtime_error"),
            Ok(false) => tracing::debug!(%submission_id, "Submission already terminal"),
            Err(err) => tracing::error!(
                %submission_id,
                error = %err,
                "Could not mark submission runtime_error; the sweeper will retry"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::{
        db::{LeaderboardStore, MemoryStore, SubmissionStore},
        execution::{ExecutionError, MockExecutionBackend},
        models::SubmissionStatus,
        test_utils::{new_submission, problem_with_cases},
    };

    async fn setup(weights: &[i32]) -> (Arc<MemoryStore>, Problem, Submission) {
        let store = Arc::new(MemoryStore::new());
        let (problem, cases) = problem_with_cases(weights);
        store.insert_problem(problem.clone(), cases).await;
        let submission = store
            .create_submission(&new_submission(&problem, Uuid::new_v4(), None), 0)
            .await
            .unwrap();
        (store, problem, submission)
    }

    /// Backend answering with the given statuses in call order
    fn scripted(statuses: Vec<SubmissionStatus>) -> (MockExecutionBackend, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut backend = MockExecutionBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_execute().returning(move |_| {
            let i = counter.fetch_add(1, Ordering::SeqCst);
            match statuses[i] {
                SubmissionStatus::CompileError => Ok(ExecutionOutcome::compile_error("error: expected ';'")),
                status => Ok(ExecutionOutcome::judged(status, String::new(), String::new(), 10 + i as i64)),
            }
        });
        (backend, calls)
    }

    fn service(store: Arc<MemoryStore>, backend: MockExecutionBackend) -> GradingService {
        GradingService::new(store, Arc::new(backend))
    }

    #[tokio::test]
    async fn test_partial_credit_keeps_first_failure_status() {
        let (store, problem, submission) = setup(&[1, 1, 1, 1]).await;
        let (backend, calls) = scripted(vec![
            SubmissionStatus::Accepted,
            SubmissionStatus::WrongAnswer,
            SubmissionStatus::Accepted,
            SubmissionStatus::TimeLimitExceeded,
            SubmissionStatus::Accepted,
        ]);

        let judgement = service(store.clone(), backend)
            .grade(submission.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(judgement.score, 75.0);
        assert_eq!(judgement.status, SubmissionStatus::WrongAnswer);
        assert_eq!(judgement.outcomes.len(), 4);
        assert_eq!(judgement.execution_time_ms, 13);
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        let weights: i32 = judgement.outcomes.iter().map(|o| o.weight).sum();
        assert_eq!(weights, 4);

        let stored = store.find_submission(submission.id).await.unwrap().unwrap();
        assert_eq!(stored.status(), SubmissionStatus::WrongAnswer);
        assert_eq!(stored.score, 75.0);
        assert!(stored.judged_at.is_some());
        assert_eq!(store.outcomes(submission.id).await.unwrap().len(), 4);

        let entries = store.entries(problem.event_id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].total_score, 75.0);
    }

    #[tokio::test]
    async fn test_compile_error_stops_after_first_case() {
        let (store, _problem, submission) = setup(&[1, 1, 1]).await;
        let (backend, calls) = scripted(vec![SubmissionStatus::CompileError]);

        let judgement = service(store.clone(), backend)
            .grade(submission.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(judgement.status, SubmissionStatus::CompileError);
        assert_eq!(judgement.score, 0.0);
        assert_eq!(judgement.outcomes.len(), 1);
        assert_eq!(
            judgement.outcomes[0].compile_output.as_deref(),
            Some("error: expected ';'")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_test_cases_is_accepted() {
        let (store, _problem, submission) = setup(&[]).await;
        let mut backend = MockExecutionBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_execute().never();

        let judgement = service(store, backend)
            .grade(submission.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(judgement.status, SubmissionStatus::Accepted);
        assert_eq!(judgement.score, 100.0);
        assert!(judgement.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_backend_error_is_scoped_to_one_case() {
        let (store, _problem, submission) = setup(&[1, 3]).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut backend = MockExecutionBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_execute().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ExecutionError::Transient("connection reset".into()))
            } else {
                Ok(ExecutionOutcome::with_status(SubmissionStatus::Accepted))
            }
        });

        let judgement = service(store, backend)
            .grade(submission.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(judgement.status, SubmissionStatus::RuntimeError);
        assert_eq!(judgement.score, 75.0);
        assert_eq!(judgement.outcomes[0].stderr.as_deref(), Some("transient execution failure: connection reset"));
    }

    /// Panics on the second call
    struct FlakyBackend {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ExecutionBackend for FlakyBackend {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn execute(&self, _request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutionError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
                panic!("backend bug");
            }
            Ok(ExecutionOutcome::with_status(SubmissionStatus::Accepted))
        }
    }

    #[tokio::test]
    async fn test_panicking_backend_becomes_runtime_error() {
        let (store, _problem, submission) = setup(&[1, 1, 1, 1]).await;
        let backend = FlakyBackend {
            calls: AtomicUsize::new(0),
        };

        let judgement = GradingService::new(store, Arc::new(backend))
            .grade(submission.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(judgement.status, SubmissionStatus::RuntimeError);
        assert_eq!(judgement.score, 75.0);
        assert_eq!(judgement.outcomes.len(), 4);
        assert!(judgement.outcomes[1].stderr.as_deref().unwrap().contains("execution task failed"));
    }

    #[tokio::test]
    async fn test_tle_case_reports_limit_and_earns_nothing() {
        let (store, problem, submission) = setup(&[2, 1]).await;
        let limit = Duration::from_millis(problem.time_limit_ms as u64);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut backend = MockExecutionBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_execute().returning(move |req| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(ExecutionOutcome::time_limit_exceeded(req.time_limit))
            } else {
                Ok(ExecutionOutcome::with_status(SubmissionStatus::Accepted))
            }
        });

        let judgement = service(store, backend)
            .grade(submission.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(judgement.status, SubmissionStatus::TimeLimitExceeded);
        assert_eq!(judgement.outcomes[0].execution_time_ms, limit.as_millis() as i64);
        assert_eq!(judgement.score, 33.33);
    }

    #[tokio::test]
    async fn test_second_grade_of_same_submission_is_skipped() {
        let (store, _problem, submission) = setup(&[1]).await;
        let (backend, calls) = scripted(vec![SubmissionStatus::Accepted, SubmissionStatus::Accepted]);
        let grader = service(store, backend);

        assert!(grader.grade(submission.id).await.unwrap().is_some());
        assert!(grader.grade(submission.id).await.unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_problem_forces_runtime_error() {
        let store = Arc::new(MemoryStore::new());
        let (problem, _cases) = problem_with_cases(&[1]);
        // Problem never registered
        let submission = store
            .create_submission(&new_submission(&problem, Uuid::new_v4(), None), 0)
            .await
            .unwrap();
        let mut backend = MockExecutionBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_execute().never();

        let err = service(store.clone(), backend)
            .grade(submission.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Orchestration(_)));

        let stored = store.find_submission(submission.id).await.unwrap().unwrap();
        assert_eq!(stored.status(), SubmissionStatus::RuntimeError);
        assert_eq!(stored.score, 0.0);
        assert!(stored.error_message.is_some());
    }

    #[tokio::test]
    async fn test_best_score_per_problem_reaches_leaderboard() {
        let (store, problem, first) = setup(&[2, 3]).await;
        let user_id = first.user_id;

        // 40: only the weight-2 case passes
        let (backend, _) = scripted(vec![SubmissionStatus::Accepted, SubmissionStatus::WrongAnswer]);
        service(store.clone(), backend).grade(first.id).await.unwrap();

        let second = store
            .create_submission(&new_submission(&problem, user_id, None), 0)
            .await
            .unwrap();
        // 60: only the weight-3 case passes
        let (backend, _) = scripted(vec![SubmissionStatus::WrongAnswer, SubmissionStatus::Accepted]);
        service(store.clone(), backend).grade(second.id).await.unwrap();

        let third = store
            .create_submission(&new_submission(&problem, user_id, None), 0)
            .await
            .unwrap();
        // A worse retry must not lower the standing
        let (backend, _) = scripted(vec![SubmissionStatus::RuntimeError, SubmissionStatus::RuntimeError]);
        service(store.clone(), backend).grade(third.id).await.unwrap();

        let entries = store.entries(problem.event_id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].total_score, 60.0);
        assert_eq!(entries[0].problems_solved, 0);
        assert_eq!(entries[0].last_submission, Some(third.submitted_at));
    }
}
