//! Local sandbox runner
//!
//! Compiles (when needed) and runs the program as a child process inside a
//! fresh temporary directory. There is no resource isolation beyond the
//! wall-clock limit and memory is not measured, so this backend is meant for
//! development and trusted demo deployments only.

use std::collections::HashMap;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use super::{
    ExecutionBackend, ExecutionError, ExecutionOutcome, ExecutionRequest, duration_ms,
    languages::{Placeholders, Toolchain, java},
    output_matches,
};
use crate::{
    config::LocalJudgeConfig,
    models::{Language, SubmissionStatus},
};

/// Runs programs as local processes
pub struct LocalSandboxRunner {
    config: LocalJudgeConfig,
    toolchains: HashMap<Language, Toolchain>,
}

/// How a child process ended
enum ProcessExit {
    Finished { output: Output, elapsed: Duration },
    TimedOut,
}

impl LocalSandboxRunner {
    pub fn new(config: LocalJudgeConfig) -> Self {
        let toolchains = Language::ALL
            .into_iter()
            .map(|lang| (lang, Toolchain::for_language(lang)))
            .collect();
        Self { config, toolchains }
    }

    /// Replace the toolchain used for `language`
    pub fn with_toolchain(mut self, language: Language, toolchain: Toolchain) -> Self {
        self.toolchains.insert(language, toolchain);
        self
    }

    async fn compile(
        &self,
        argv: &[String],
        workdir: &Path,
    ) -> Result<Option<ExecutionOutcome>, ExecutionError> {
        tracing::debug!(command = ?argv, "Compiling");

        match spawn_and_wait(argv, workdir, None, self.config.compile_timeout).await? {
            ProcessExit::TimedOut => Ok(Some(ExecutionOutcome::compile_error(format!(
                "Compilation timed out after {}s",
                self.config.compile_timeout.as_secs()
            )))),
            ProcessExit::Finished { output, .. } if !output.status.success() => {
                let mut diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
                let stdout = String::from_utf8_lossy(&output.stdout);
                if !stdout.trim().is_empty() {
                    diagnostics.push_str(&stdout);
                }
                Ok(Some(ExecutionOutcome::compile_error(diagnostics)))
            }
            ProcessExit::Finished { .. } => Ok(None),
        }
    }
}

#[async_trait]
impl ExecutionBackend for LocalSandboxRunner {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutionError> {
        let toolchain = self.toolchains.get(&request.language).ok_or_else(|| {
            ExecutionError::Sandbox(format!("no toolchain for {}", request.language))
        })?;

        // Removed when dropped, including on early return
        let workdir = tempfile::Builder::new().prefix("campus-judge-").tempdir()?;

        let class_name = match request.language {
            Language::Java => java::public_class_name(&request.source_code),
            _ => "Main".to_string(),
        };
        let vars = Placeholders {
            workdir: workdir.path(),
            class_name: &class_name,
        };

        let source_path = workdir.path().join(toolchain.source_file(&vars));
        tokio::fs::write(&source_path, &request.source_code).await?;

        if let Some(argv) = toolchain.compile_command(&vars) {
            if let Some(failed) = self.compile(&argv, workdir.path()).await? {
                return Ok(failed);
            }
        }

        let argv = toolchain.run_command(&vars);
        let exit = spawn_and_wait(&argv, workdir.path(), Some(&request.stdin), request.time_limit).await?;

        let (output, elapsed) = match exit {
            ProcessExit::TimedOut => {
                return Ok(ExecutionOutcome::time_limit_exceeded(request.time_limit));
            }
            ProcessExit::Finished { output, elapsed } => (output, elapsed),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let time_ms = duration_ms(elapsed);

        if !output.status.success() {
            if stderr.trim().is_empty() {
                stderr = describe_failure(&output);
            }
            return Ok(ExecutionOutcome::judged(
                SubmissionStatus::RuntimeError,
                stdout,
                stderr,
                time_ms,
            ));
        }

        let status = match &request.expected_output {
            Some(expected) if !output_matches(&stdout, expected) => SubmissionStatus::WrongAnswer,
            _ => SubmissionStatus::Accepted,
        };

        Ok(ExecutionOutcome::judged(status, stdout, stderr, time_ms))
    }
}

/// Spawn `argv` in `workdir`, feed `stdin` and wait at most `limit`.
///
/// The child is killed when the limit expires.
async fn spawn_and_wait(
    argv: &[String],
    workdir: &Path,
    stdin: Option<&str>,
    limit: Duration,
) -> Result<ProcessExit, ExecutionError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ExecutionError::Sandbox("empty command".to_string()))?;

    let mut child = Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExecutionError::Sandbox(format!("failed to start {}: {}", program, e)))?;

    let started = Instant::now();

    if let (Some(mut pipe), Some(input)) = (child.stdin.take(), stdin) {
        let input = input.to_owned();
        // Programs that never read stdin close the pipe early; that is not an error
        tokio::spawn(async move {
            let _ = pipe.write_all(input.as_bytes()).await;
            let _ = pipe.shutdown().await;
        });
    }

    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(ProcessExit::Finished {
            output,
            elapsed: started.elapsed(),
        }),
        Ok(Err(e)) => Err(ExecutionError::Sandbox(format!("failed waiting for {}: {}", program, e))),
        // Dropping the wait future drops the child, which kills it
        Err(_) => Ok(ProcessExit::TimedOut),
    }
}

fn describe_failure(output: &Output) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = output.status.signal() {
            return format!("Killed by signal {}", signal);
        }
    }
    format!(
        "Process exited with code {}",
        output.status.code().unwrap_or(-1)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every language runs its source through `sh`; C additionally "compiles"
    /// with `sh -n`, which fails on syntax errors
    fn runner() -> LocalSandboxRunner {
        LocalSandboxRunner::new(LocalJudgeConfig {
            compile_timeout: Duration::from_secs(5),
        })
        .with_toolchain(
            Language::Python,
            Toolchain::new("main.sh", None, &["sh", "{src}"]),
        )
        .with_toolchain(
            Language::C,
            Toolchain::new("main.sh", Some(&["sh", "-n", "{src}"]), &["sh", "{src}"]),
        )
    }

    fn request(language: Language, source: &str, stdin: &str, expected: Option<&str>) -> ExecutionRequest {
        ExecutionRequest {
            source_code: source.to_string(),
            language,
            stdin: stdin.to_string(),
            expected_output: expected.map(str::to_string),
            time_limit: Duration::from_millis(1000),
            memory_limit_kb: 262_144,
        }
    }

    #[tokio::test]
    async fn test_accepts_matching_output() {
        let outcome = runner()
            .execute(&request(Language::Python, "read x\necho $((x * 2))", "21\n", Some("42")))
            .await
            .unwrap();
        assert_eq!(outcome.status, SubmissionStatus::Accepted);
        assert!(outcome.passed);
        assert_eq!(outcome.stdout.trim(), "42");
        assert_eq!(outcome.memory_kb, 0);
    }

    #[tokio::test]
    async fn test_wrong_answer() {
        let outcome = runner()
            .execute(&request(Language::Python, "echo 41", "", Some("42")))
            .await
            .unwrap();
        assert_eq!(outcome.status, SubmissionStatus::WrongAnswer);
        assert!(!outcome.passed);
    }

    #[tokio::test]
    async fn test_without_expected_output_clean_exit_passes() {
        let outcome = runner()
            .execute(&request(Language::Python, "echo anything", "", None))
            .await
            .unwrap();
        assert_eq!(outcome.status, SubmissionStatus::Accepted);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_runtime_error() {
        let outcome = runner()
            .execute(&request(Language::Python, "echo oops >&2\nexit 3", "", Some("1")))
            .await
            .unwrap();
        assert_eq!(outcome.status, SubmissionStatus::RuntimeError);
        assert!(outcome.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn test_timeout_reports_limit_as_elapsed() {
        let mut req = request(Language::Python, "sleep 5", "", Some(""));
        req.time_limit = Duration::from_millis(200);

        let started = Instant::now();
        let outcome = runner().execute(&req).await.unwrap();

        assert_eq!(outcome.status, SubmissionStatus::TimeLimitExceeded);
        assert_eq!(outcome.time_ms, 200);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_compile_failure_short_circuits() {
        let outcome = runner()
            .execute(&request(Language::C, "if then fi (", "", Some("")))
            .await
            .unwrap();
        assert_eq!(outcome.status, SubmissionStatus::CompileError);
        assert!(outcome.compile_output.is_some());
        assert!(outcome.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_compiled_program_runs_after_successful_compile() {
        let outcome = runner()
            .execute(&request(Language::C, "echo compiled", "", Some("compiled")))
            .await
            .unwrap();
        assert_eq!(outcome.status, SubmissionStatus::Accepted);
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_sandbox_error() {
        let runner = runner().with_toolchain(
            Language::JavaScript,
            Toolchain::new("main.js", None, &["definitely-not-a-real-binary", "{src}"]),
        );
        let err = runner
            .execute(&request(Language::JavaScript, "1", "", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Sandbox(_)));
    }
}
