//! Application configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! All configuration is loaded at startup and validated before the application runs.

use std::env;
use std::sync::LazyLock;
use std::time::Duration;

use uuid::Uuid;

use crate::constants::{
    DEFAULT_COMPILE_TIMEOUT_SECS, DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_JUDGE_URL,
    DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_TIMEOUT_SECS,
    DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, DEFAULT_STALE_QUEUED_SECS,
    DEFAULT_STALE_RUNNING_SECS, DEFAULT_SUBMISSION_COOLDOWN_SECS, DEFAULT_SUBMIT_TIMEOUT_SECS,
    DEFAULT_SWEEP_INTERVAL_SECS, DEFAULT_WORKER_COUNT, MAX_SOURCE_CODE_SIZE,
};

/// Global application configuration (lazily initialized)
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::from_env().expect("Failed to load configuration from environment")
});

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub judge: JudgeConfig,
    pub grading: GradingConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    /// Emit JSON log lines instead of the human-readable format
    pub json_logs: bool,
    /// Users allowed to trigger leaderboard rebuilds
    pub admin_user_ids: Vec<Uuid>,
}

/// Database configuration
///
/// Without a URL the service runs against the in-memory store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: Option<String>,
}

/// Which execution backend grades submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Remote,
    Local,
}

/// Execution backend configuration
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub backend: BackendKind,
    pub remote: RemoteJudgeConfig,
    pub local: LocalJudgeConfig,
}

/// Remote (Judge0-compatible) service settings
#[derive(Debug, Clone)]
pub struct RemoteJudgeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub submit_timeout: Duration,
    pub poll_timeout: Duration,
}

/// Local sandbox runner settings
#[derive(Debug, Clone)]
pub struct LocalJudgeConfig {
    pub compile_timeout: Duration,
}

/// Where grading jobs are queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Redis,
    Memory,
}

/// Grading pipeline configuration
#[derive(Debug, Clone)]
pub struct GradingConfig {
    pub workers: usize,
    pub queue: QueueKind,
    /// Per participant and problem
    pub cooldown_secs: i64,
    pub stale_running_secs: i64,
    pub stale_queued_secs: i64,
    pub sweep_interval: Duration,
    pub max_source_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let redis = RedisConfig::from_env()?;
        let grading = GradingConfig::from_env(&redis)?;

        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            judge: JudgeConfig::from_env()?,
            redis,
            grading,
        })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            port: parse_var("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json_logs: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            admin_user_ids: optional_var("ADMIN_USER_IDS")
                .map(|raw| parse_id_list(&raw))
                .transpose()
                .map_err(|_| ConfigError::InvalidValue("ADMIN_USER_IDS".to_string()))?
                .unwrap_or_default(),
        })
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: optional_var("DATABASE_URL"),
            max_connections: parse_var(
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            )?,
        })
    }
}

impl RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: optional_var("REDIS_URL"),
        })
    }
}

impl BackendKind {
    /// Resolve the backend from an explicit choice or, when absent or `auto`,
    /// from the remote settings: no API key and a localhost URL means local.
    pub fn resolve(choice: Option<&str>, remote: &RemoteJudgeConfig) -> Result<Self, ConfigError> {
        match choice.map(str::to_ascii_lowercase).as_deref() {
            Some("remote") => Ok(Self::Remote),
            Some("local") => Ok(Self::Local),
            None | Some("auto") => {
                if remote.api_key.is_none() && remote.base_url.contains("localhost") {
                    Ok(Self::Local)
                } else {
                    Ok(Self::Remote)
                }
            }
            Some(_) => Err(ConfigError::InvalidValue("JUDGE_BACKEND".to_string())),
        }
    }
}

impl JudgeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let remote = RemoteJudgeConfig::from_env()?;
        let backend = BackendKind::resolve(optional_var("JUDGE_BACKEND").as_deref(), &remote)?;

        Ok(Self {
            backend,
            remote,
            local: LocalJudgeConfig {
                compile_timeout: Duration::from_secs(parse_var(
                    "LOCAL_COMPILE_TIMEOUT_SECS",
                    DEFAULT_COMPILE_TIMEOUT_SECS,
                )?),
            },
        })
    }
}

impl RemoteJudgeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_poll_attempts = parse_var("JUDGE0_MAX_POLL_ATTEMPTS", DEFAULT_MAX_POLL_ATTEMPTS)?;
        if max_poll_attempts == 0 {
            return Err(ConfigError::InvalidValue("JUDGE0_MAX_POLL_ATTEMPTS".to_string()));
        }

        Ok(Self {
            base_url: env::var("JUDGE0_URL")
                .unwrap_or_else(|_| DEFAULT_JUDGE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: optional_var("JUDGE0_API_KEY"),
            poll_interval: Duration::from_millis(parse_var(
                "JUDGE0_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            max_poll_attempts,
            submit_timeout: Duration::from_secs(parse_var(
                "JUDGE0_SUBMIT_TIMEOUT_SECS",
                DEFAULT_SUBMIT_TIMEOUT_SECS,
            )?),
            poll_timeout: Duration::from_secs(parse_var(
                "JUDGE0_POLL_TIMEOUT_SECS",
                DEFAULT_POLL_TIMEOUT_SECS,
            )?),
        })
    }
}

impl GradingConfig {
    fn from_env(redis: &RedisConfig) -> Result<Self, ConfigError> {
        let queue = match optional_var("JOB_QUEUE").map(|v| v.to_ascii_lowercase()).as_deref() {
            Some("redis") => QueueKind::Redis,
            Some("memory") => QueueKind::Memory,
            None if redis.url.is_some() => QueueKind::Redis,
            None => QueueKind::Memory,
            Some(_) => return Err(ConfigError::InvalidValue("JOB_QUEUE".to_string())),
        };
        if queue == QueueKind::Redis && redis.url.is_none() {
            return Err(ConfigError::Missing("REDIS_URL".to_string()));
        }

        let workers = parse_var("GRADING_WORKERS", DEFAULT_WORKER_COUNT)?;
        if workers == 0 {
            return Err(ConfigError::InvalidValue("GRADING_WORKERS".to_string()));
        }

        let sweep_interval_secs = parse_var("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        if sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("SWEEP_INTERVAL_SECS".to_string()));
        }

        Ok(Self {
            workers,
            queue,
            cooldown_secs: parse_var("SUBMISSION_COOLDOWN_SECS", DEFAULT_SUBMISSION_COOLDOWN_SECS)?,
            stale_running_secs: parse_var("STALE_RUNNING_SECS", DEFAULT_STALE_RUNNING_SECS)?,
            stale_queued_secs: parse_var("STALE_QUEUED_SECS", DEFAULT_STALE_QUEUED_SECS)?,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            max_source_bytes: parse_var("MAX_SOURCE_BYTES", MAX_SOURCE_CODE_SIZE)?,
        })
    }
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKER_COUNT,
            queue: QueueKind::Memory,
            cooldown_secs: DEFAULT_SUBMISSION_COOLDOWN_SECS,
            stale_running_secs: DEFAULT_STALE_RUNNING_SECS,
            stale_queued_secs: DEFAULT_STALE_QUEUED_SECS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            max_source_bytes: MAX_SOURCE_CODE_SIZE,
        }
    }
}

impl Default for RemoteJudgeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_JUDGE_URL.to_string(),
            api_key: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            submit_timeout: Duration::from_secs(DEFAULT_SUBMIT_TIMEOUT_SECS),
            poll_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

impl Default for LocalJudgeConfig {
    fn default() -> Self {
        Self {
            compile_timeout: Duration::from_secs(DEFAULT_COMPILE_TIMEOUT_SECS),
        }
    }
}

/// Read a variable, treating unset and blank the same
fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match optional_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Comma-separated UUIDs; blank items are skipped
fn parse_id_list(raw: &str) -> Result<Vec<Uuid>, uuid::Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(Uuid::parse_str)
        .collect()
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let remote = RemoteJudgeConfig::default();
        assert_eq!(remote.base_url, "http://localhost:2358");
        assert_eq!(remote.max_poll_attempts, 15);
        assert_eq!(remote.poll_interval, Duration::from_secs(2));

        let grading = GradingConfig::default();
        assert_eq!(grading.cooldown_secs, 30);
        assert_eq!(grading.max_source_bytes, 1024 * 1024);
    }

    #[test]
    fn test_parse_id_list() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(parse_id_list(&format!("{}, {},", a, b)).unwrap(), vec![a, b]);
        assert!(parse_id_list("").unwrap().is_empty());
        assert!(parse_id_list("root").is_err());
    }

    #[test]
    fn test_backend_auto_selects_local_for_unauthenticated_localhost() {
        let remote = RemoteJudgeConfig::default();
        assert_eq!(BackendKind::resolve(None, &remote).unwrap(), BackendKind::Local);
        assert_eq!(
            BackendKind::resolve(Some("auto"), &remote).unwrap(),
            BackendKind::Local
        );
    }

    #[test]
    fn test_backend_auto_selects_remote_with_key_or_remote_host() {
        let keyed = RemoteJudgeConfig {
            api_key: Some("secret".to_string()),
            ..RemoteJudgeConfig::default()
        };
        assert_eq!(BackendKind::resolve(None, &keyed).unwrap(), BackendKind::Remote);

        let hosted = RemoteJudgeConfig {
            base_url: "https://judge.example.edu".to_string(),
            ..RemoteJudgeConfig::default()
        };
        assert_eq!(BackendKind::resolve(None, &hosted).unwrap(), BackendKind::Remote);
    }

    #[test]
    fn test_backend_explicit_choice_wins() {
        let keyed = RemoteJudgeConfig {
            api_key: Some("secret".to_string()),
            ..RemoteJudgeConfig::default()
        };
        assert_eq!(
            BackendKind::resolve(Some("LOCAL"), &keyed).unwrap(),
            BackendKind::Local
        );
        assert!(matches!(
            BackendKind::resolve(Some("docker"), &keyed),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
