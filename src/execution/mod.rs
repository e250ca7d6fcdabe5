//! Execution backends
//!
//! A backend runs one program against one stdin/expected-output pair and
//! reports a normalized [`ExecutionOutcome`]. Two interchangeable backends
//! exist: [`RemoteJudgeClient`] talks to a Judge0-compatible service and
//! [`LocalSandboxRunner`] compiles and runs the program as a local process.
//! The backend is chosen once at startup by [`build_backend`].

pub mod languages;
pub mod local;
pub mod remote;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    config::{BackendKind, JudgeConfig},
    models::{Language, SubmissionStatus},
};

pub use local::LocalSandboxRunner;
pub use remote::RemoteJudgeClient;

/// One program run against one test input
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub source_code: String,
    pub language: Language,
    pub stdin: String,
    /// When absent, running without error counts as a pass
    pub expected_output: Option<String>,
    pub time_limit: Duration,
    pub memory_limit_kb: i64,
}

/// Normalized result of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutcome {
    pub status: SubmissionStatus,
    pub stdout: String,
    pub stderr: String,
    pub compile_output: Option<String>,
    pub time_ms: i64,
    pub memory_kb: i64,
    pub passed: bool,
}

impl ExecutionOutcome {
    /// Outcome with the given status; `passed` follows from it
    pub fn with_status(status: SubmissionStatus) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: String::new(),
            compile_output: None,
            time_ms: 0,
            memory_kb: 0,
            passed: status.is_accepted(),
        }
    }

    /// Program ran and its output was judged
    pub fn judged(status: SubmissionStatus, stdout: String, stderr: String, time_ms: i64) -> Self {
        Self {
            stdout,
            stderr,
            time_ms,
            ..Self::with_status(status)
        }
    }

    /// Killed at the wall-clock limit; elapsed time is reported as the limit
    pub fn time_limit_exceeded(time_limit: Duration) -> Self {
        Self {
            stderr: "Time Limit Exceeded".to_string(),
            time_ms: duration_ms(time_limit),
            ..Self::with_status(SubmissionStatus::TimeLimitExceeded)
        }
    }

    pub fn compile_error(diagnostics: impl Into<String>) -> Self {
        Self {
            compile_output: Some(diagnostics.into()),
            ..Self::with_status(SubmissionStatus::CompileError)
        }
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self {
            stderr: message.into(),
            ..Self::with_status(SubmissionStatus::RuntimeError)
        }
    }
}

/// Errors that keep a backend from producing an outcome at all
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// Network or transport failure talking to the remote service
    #[error("transient execution failure: {0}")]
    Transient(String),

    /// The remote service answered with something we cannot interpret
    #[error("unexpected judge response: {0}")]
    Protocol(String),

    /// The local sandbox could not be prepared or the program not started
    #[error("sandbox failure: {0}")]
    Sandbox(String),
}

impl From<reqwest::Error> for ExecutionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ExecutionError::Protocol(err.to_string())
        } else {
            ExecutionError::Transient(err.to_string())
        }
    }
}

impl From<std::io::Error> for ExecutionError {
    fn from(err: std::io::Error) -> Self {
        ExecutionError::Sandbox(err.to_string())
    }
}

/// Runs a single program against a single test input
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutionError>;
}

/// Construct the configured backend
pub fn build_backend(config: &JudgeConfig) -> Result<Arc<dyn ExecutionBackend>, ExecutionError> {
    let backend: Arc<dyn ExecutionBackend> = match config.backend {
        BackendKind::Remote => Arc::new(RemoteJudgeClient::new(config.remote.clone())?),
        BackendKind::Local => Arc::new(LocalSandboxRunner::new(config.local.clone())),
    };
    tracing::info!(backend = backend.name(), "Execution backend selected");
    Ok(backend)
}

/// Compare program output with the expected output, ignoring surrounding
/// whitespace and line-ending style
pub fn output_matches(actual: &str, expected: &str) -> bool {
    let actual_normalized = actual.replace("\r\n", "\n");
    let expected_normalized = expected.replace("\r\n", "\n");
    actual_normalized.trim() == expected_normalized.trim()
}

pub(crate) fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
