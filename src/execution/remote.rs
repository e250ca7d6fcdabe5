//! Remote judge client
//!
//! Speaks the Judge0 CE submission API: one non-blocking submit returning a
//! token, then a bounded number of polls until the job reaches a terminal
//! status.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ExecutionBackend, ExecutionError, ExecutionOutcome, ExecutionRequest};
use crate::{
    config::RemoteJudgeConfig,
    constants::RAPIDAPI_JUDGE_HOST,
    models::SubmissionStatus,
};

/// Judge0 status ids at or above this are terminal
const FIRST_TERMINAL_STATUS: i64 = 3;

/// Client for a Judge0-compatible service
pub struct RemoteJudgeClient {
    client: Client,
    config: RemoteJudgeConfig,
}

#[derive(Debug, Serialize)]
struct SubmitPayload<'a> {
    source_code: &'a str,
    language_id: i32,
    stdin: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_output: Option<&'a str>,
    cpu_time_limit: f64,
    memory_limit: i64,
    enable_network: bool,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    id: i64,
}

/// Judge0 reports some numbers as strings ("0.012") and others as numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    fn value(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobResult {
    status: JobStatus,
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    message: Option<String>,
    /// Seconds
    time: Option<LooseNumber>,
    /// Kilobytes
    memory: Option<LooseNumber>,
}

impl JobResult {
    fn is_terminal(&self) -> bool {
        self.status.id >= FIRST_TERMINAL_STATUS
    }

    fn into_outcome(self) -> ExecutionOutcome {
        let status = map_status(self.status.id);
        let time_ms = self
            .time
            .map(|t| (t.value() * 1000.0).round() as i64)
            .unwrap_or(0);
        let memory_kb = self.memory.map(|m| m.value().round() as i64).unwrap_or(0);

        let mut stderr = self.stderr.unwrap_or_default();
        if stderr.is_empty() && status == SubmissionStatus::RuntimeError {
            stderr = self.message.unwrap_or_default();
        }

        ExecutionOutcome {
            status,
            stdout: self.stdout.unwrap_or_default(),
            stderr,
            compile_output: self.compile_output.filter(|c| !c.is_empty()),
            time_ms,
            memory_kb,
            passed: status.is_accepted(),
        }
    }
}

/// Map a Judge0 status id onto the shared taxonomy
pub fn map_status(id: i64) -> SubmissionStatus {
    match id {
        1 => SubmissionStatus::Queued,
        2 => SubmissionStatus::Running,
        3 => SubmissionStatus::Accepted,
        4 => SubmissionStatus::WrongAnswer,
        5 => SubmissionStatus::TimeLimitExceeded,
        6 => SubmissionStatus::CompileError,
        7..=13 => SubmissionStatus::RuntimeError,
        14 => SubmissionStatus::MemoryLimitExceeded,
        _ => SubmissionStatus::RuntimeError,
    }
}

impl RemoteJudgeClient {
    pub fn new(config: RemoteJudgeConfig) -> Result<Self, ExecutionError> {
        let client = Client::builder()
            .user_agent(concat!("campus-judge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.config.base_url.contains(RAPIDAPI_JUDGE_HOST) {
            let key = self.config.api_key.as_deref().unwrap_or_default();
            request
                .header("X-RapidAPI-Key", key)
                .header("X-RapidAPI-Host", RAPIDAPI_JUDGE_HOST)
        } else if let Some(key) = &self.config.api_key {
            request.header("X-Auth-Token", key)
        } else {
            request
        }
    }

    async fn submit(&self, request: &ExecutionRequest) -> Result<String, ExecutionError> {
        let payload = SubmitPayload {
            source_code: &request.source_code,
            language_id: request.language.judge0_id(),
            stdin: &request.stdin,
            expected_output: request.expected_output.as_deref(),
            cpu_time_limit: request.time_limit.as_secs_f64(),
            memory_limit: request.memory_limit_kb,
            enable_network: false,
        };

        let url = format!(
            "{}/submissions?base64_encoded=false&wait=false",
            self.config.base_url
        );
        let response = self
            .authorize(self.client.post(&url))
            .timeout(self.config.submit_timeout)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutionError::Transient(format!(
                "submit rejected with {}: {}",
                status, body
            )));
        }

        let submitted: SubmitResponse = response.json().await?;
        Ok(submitted.token)
    }

    /// One poll; `None` when the service answered with a non-success status
    async fn poll(&self, token: &str) -> Result<Option<JobResult>, ExecutionError> {
        let url = format!(
            "{}/submissions/{}?base64_encoded=false&fields=*",
            self.config.base_url, token
        );
        let response = self
            .authorize(self.client.get(&url))
            .timeout(self.config.poll_timeout)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            tracing::warn!(token, status = %response.status(), "Poll answered with non-success status");
            return Ok(None);
        }

        Ok(Some(response.json().await?))
    }
}

#[async_trait]
impl ExecutionBackend for RemoteJudgeClient {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutionError> {
        let token = self.submit(request).await?;
        tracing::debug!(token = %token, language = %request.language, "Submitted to remote judge");

        for attempt in 1..=self.config.max_poll_attempts {
            tokio::time::sleep(self.config.poll_interval).await;

            if let Some(result) = self.poll(&token).await? {
                if result.is_terminal() {
                    tracing::debug!(token = %token, attempt, status = result.status.id, "Remote job finished");
                    return Ok(result.into_outcome());
                }
            }
        }

        tracing::warn!(
            token = %token,
            attempts = self.config.max_poll_attempts,
            "Remote judge did not finish in time"
        );
        Ok(ExecutionOutcome::runtime_error(
            "Remote judge execution timed out during polling",
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::{
        Json, Router,
        extract::{Path, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::{get, post},
    };
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;
    use crate::models::Language;

    /// Scripted stand-in for a Judge0 server
    #[derive(Clone, Default)]
    struct FakeJudge {
        polls: Arc<Mutex<VecDeque<(u16, Value)>>>,
        poll_count: Arc<Mutex<usize>>,
        submitted: Arc<Mutex<Option<Value>>>,
        auth_token: Arc<Mutex<Option<String>>>,
    }

    async fn submit(
        State(fake): State<FakeJudge>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (AxumStatus, Json<Value>) {
        *fake.submitted.lock().unwrap() = Some(body);
        *fake.auth_token.lock().unwrap() = headers
            .get("X-Auth-Token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        (AxumStatus::CREATED, Json(json!({ "token": "tok-1" })))
    }

    async fn poll(
        State(fake): State<FakeJudge>,
        Path(token): Path<String>,
    ) -> (AxumStatus, Json<Value>) {
        assert_eq!(token, "tok-1");
        *fake.poll_count.lock().unwrap() += 1;
        let next = fake.polls.lock().unwrap().pop_front();
        match next {
            Some((code, body)) => (AxumStatus::from_u16(code).unwrap(), Json(body)),
            None => (AxumStatus::OK, Json(json!({ "status": { "id": 2 } }))),
        }
    }

    async fn spawn_fake(polls: Vec<(u16, Value)>) -> (String, FakeJudge) {
        let fake = FakeJudge {
            polls: Arc::new(Mutex::new(polls.into())),
            ..FakeJudge::default()
        };
        let app = Router::new()
            .route("/submissions", post(submit))
            .route("/submissions/{token}", get(poll))
            .with_state(fake.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), fake)
    }

    fn client(base_url: String, api_key: Option<&str>) -> RemoteJudgeClient {
        RemoteJudgeClient::new(RemoteJudgeConfig {
            base_url,
            api_key: api_key.map(str::to_string),
            poll_interval: Duration::from_millis(10),
            max_poll_attempts: 5,
            submit_timeout: Duration::from_secs(2),
            poll_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    fn request() -> ExecutionRequest {
        ExecutionRequest {
            source_code: "print(input())".to_string(),
            language: Language::Python,
            stdin: "7".to_string(),
            expected_output: Some("7".to_string()),
            time_limit: Duration::from_millis(2000),
            memory_limit_kb: 262_144,
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status(3), SubmissionStatus::Accepted);
        assert_eq!(map_status(4), SubmissionStatus::WrongAnswer);
        assert_eq!(map_status(5), SubmissionStatus::TimeLimitExceeded);
        assert_eq!(map_status(6), SubmissionStatus::CompileError);
        for id in 7..=13 {
            assert_eq!(map_status(id), SubmissionStatus::RuntimeError);
        }
        assert_eq!(map_status(14), SubmissionStatus::MemoryLimitExceeded);
        assert_eq!(map_status(99), SubmissionStatus::RuntimeError);
    }

    #[tokio::test]
    async fn test_polls_until_terminal_and_converts_units() {
        let (url, fake) = spawn_fake(vec![
            (200, json!({ "status": { "id": 1 } })),
            (200, json!({ "status": { "id": 2 } })),
            (
                200,
                json!({
                    "status": { "id": 3, "description": "Accepted" },
                    "stdout": "7\n",
                    "stderr": null,
                    "time": "0.042",
                    "memory": 3480
                }),
            ),
        ])
        .await;

        let outcome = client(url, Some("secret")).execute(&request()).await.unwrap();

        assert_eq!(outcome.status, SubmissionStatus::Accepted);
        assert!(outcome.passed);
        assert_eq!(outcome.time_ms, 42);
        assert_eq!(outcome.memory_kb, 3480);
        assert_eq!(*fake.poll_count.lock().unwrap(), 3);

        let body = fake.submitted.lock().unwrap().clone().unwrap();
        assert_eq!(body["language_id"], 71);
        assert_eq!(body["cpu_time_limit"], 2.0);
        assert_eq!(body["enable_network"], false);
        assert_eq!(fake.auth_token.lock().unwrap().as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn test_non_success_poll_consumes_attempt_and_continues() {
        let (url, fake) = spawn_fake(vec![
            (500, json!({ "error": "busy" })),
            (200, json!({ "status": { "id": 4 }, "stdout": "8", "time": 0.01 })),
        ])
        .await;

        let outcome = client(url, None).execute(&request()).await.unwrap();

        assert_eq!(outcome.status, SubmissionStatus::WrongAnswer);
        assert!(!outcome.passed);
        assert_eq!(outcome.time_ms, 10);
        assert_eq!(*fake.poll_count.lock().unwrap(), 2);
        assert!(fake.auth_token.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_polling_budget_exhausted_is_runtime_error() {
        let (url, fake) = spawn_fake(Vec::new()).await;

        let outcome = client(url, None).execute(&request()).await.unwrap();

        assert_eq!(outcome.status, SubmissionStatus::RuntimeError);
        assert!(outcome.stderr.contains("timed out during polling"));
        assert_eq!(*fake.poll_count.lock().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_compile_error_keeps_diagnostics() {
        let (url, _fake) = spawn_fake(vec![(
            200,
            json!({ "status": { "id": 6 }, "compile_output": "main.cpp:1: error" }),
        )])
        .await;

        let outcome = client(url, None).execute(&request()).await.unwrap();
        assert_eq!(outcome.status, SubmissionStatus::CompileError);
        assert_eq!(outcome.compile_output.as_deref(), Some("main.cpp:1: error"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transient() {
        let err = client("http://127.0.0.1:1".to_string(), None)
            .execute(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Transient(_)));
    }
}
