//! Submission intake
//!
//! Validates a new submission, stores it as `queued` and enqueues a grading
//! job. Reads for status display live here too.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::GradingConfig,
    db::SharedStore,
    error::{AppError, AppResult},
    models::{Language, NewSubmission, Submission, TestCaseOutcome},
    utils::validate_source_code,
    worker::JobQueue,
};

/// Submission service for business logic
#[derive(Clone)]
pub struct SubmissionService {
    store: SharedStore,
    queue: Arc<dyn JobQueue>,
    config: GradingConfig,
}

impl SubmissionService {
    pub fn new(store: SharedStore, queue: Arc<dyn JobQueue>, config: GradingConfig) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    /// Create a queued submission and schedule it for grading
    pub async fn submit(&self, mut new: NewSubmission) -> AppResult<Submission> {
        let language: Language = new.language.parse()?;
        validate_source_code(&new.source_code, self.config.max_source_bytes)
            .map_err(AppError::Validation)?;

        let problem = self
            .store
            .find_problem(new.problem_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Problem not found".to_string()))?;

        if problem.event_id != new.event_id {
            return Err(AppError::Validation(
                "Problem does not belong to this event".to_string(),
            ));
        }
        if !problem.allows(language) {
            return Err(AppError::Validation(format!(
                "Language {} is not allowed for this problem (allowed: {})",
                language,
                problem.allowed_languages.join(", ")
            )));
        }

        new.language = language.as_str().to_string();
        let submission = self
            .store
            .create_submission(&new, self.config.cooldown_secs)
            .await?;

        // The sweeper re-enqueues queued submissions, so a failed push only delays grading
        if let Err(e) = self.queue.push(submission.id).await {
            tracing::error!(
                submission_id = %submission.id,
                error = %e,
                "Failed to enqueue submission"
            );
        }

        tracing::info!(
            submission_id = %submission.id,
            participant = %submission.participant(),
            problem_id = %submission.problem_id,
            language = %submission.language,
            "Submission queued"
        );

        Ok(submission)
    }

    /// Get submission by ID
    pub async fn get(&self, id: Uuid) -> AppResult<Submission> {
        self.store
            .find_submission(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))
    }

    /// Submission together with its recorded test case outcomes
    pub async fn detail(&self, id: Uuid) -> AppResult<(Submission, Vec<TestCaseOutcome>)> {
        let submission = self.get(id).await?;
        let outcomes = self.store.outcomes(id).await?;
        Ok((submission, outcomes))
    }
}
