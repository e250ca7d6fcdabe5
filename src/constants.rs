//! Application-wide constants
//!
//! This module contains all constant values used throughout the application.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// SERVER DEFAULTS
// =============================================================================

/// Default server host address
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 8080;

// =============================================================================
// DATABASE DEFAULTS
// =============================================================================

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

// =============================================================================
// JUDGE DEFAULTS
// =============================================================================

/// Default Judge0 base URL
pub const DEFAULT_JUDGE_URL: &str = "http://localhost:2358";

/// Hostname of the hosted Judge0 CE endpoint (uses RapidAPI headers)
pub const RAPIDAPI_JUDGE_HOST: &str = "judge0-ce.p.rapidapi.com";

/// Delay between two result polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Number of polls before giving up on a remote job
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 15;

/// HTTP timeout of the submit request
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 15;

/// HTTP timeout of each poll request
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 10;

/// Wall-clock budget for compiling one program locally
pub const DEFAULT_COMPILE_TIMEOUT_SECS: u64 = 30;

/// Default time limit in milliseconds
pub const DEFAULT_TIME_LIMIT_MS: i32 = 2000;

/// Default memory limit in kilobytes (256 MB)
pub const DEFAULT_MEMORY_LIMIT_KB: i32 = 262_144;

// =============================================================================
// GRADING DEFAULTS
// =============================================================================

/// Redis list used as the judge job queue
pub const JUDGE_QUEUE_KEY: &str = "judge_queue";

/// Number of concurrent grading workers
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Seconds a participant must wait between two submissions to one problem
pub const DEFAULT_SUBMISSION_COOLDOWN_SECS: i64 = 30;

/// A `running` submission older than this is considered orphaned
pub const DEFAULT_STALE_RUNNING_SECS: i64 = 600;

/// A `queued` submission older than this is pushed onto the queue again
pub const DEFAULT_STALE_QUEUED_SECS: i64 = 300;

/// Interval of the recovery sweeper
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Seconds a worker blocks on the queue before checking for shutdown
pub const QUEUE_POP_TIMEOUT_SECS: f64 = 5.0;

/// Maximum stored length of captured stdout/stderr per test case
pub const MAX_CAPTURED_OUTPUT_LEN: usize = 64 * 1024;

/// Score of a fully accepted submission
pub const FULL_SCORE: f64 = 100.0;

/// Highest score a submission with at least one failing case may reach
pub const PARTIAL_SCORE_CAP: f64 = 99.99;

// =============================================================================
// SUPPORTED LANGUAGES
// =============================================================================

/// Language identifiers
pub mod languages {
    pub const PYTHON: &str = "python";
    pub const CPP: &str = "cpp";
    pub const C: &str = "c";
    pub const JAVA: &str = "java";
    pub const JAVASCRIPT: &str = "javascript";

    /// All supported language identifiers
    pub const ALL: &[&str] = &[PYTHON, CPP, C, JAVA, JAVASCRIPT];

    /// Languages a problem allows when nothing else is configured
    pub const DEFAULT_ALLOWED: &[&str] = &[PYTHON, CPP, JAVA, JAVASCRIPT];
}

/// Judge0 language identifiers
pub mod judge0_languages {
    pub const PYTHON: i32 = 71;
    pub const CPP: i32 = 54;
    pub const C: i32 = 50;
    pub const JAVA: i32 = 62;
    pub const JAVASCRIPT: i32 = 63;
}

// =============================================================================
// SUBMISSION STATUSES
// =============================================================================

/// Submission and test case statuses
pub mod statuses {
    pub const QUEUED: &str = "queued";
    pub const RUNNING: &str = "running";
    pub const ACCEPTED: &str = "accepted";
    pub const WRONG_ANSWER: &str = "wrong_answer";
    pub const TIME_LIMIT_EXCEEDED: &str = "tle";
    pub const MEMORY_LIMIT_EXCEEDED: &str = "mle";
    pub const COMPILE_ERROR: &str = "compile_error";
    pub const RUNTIME_ERROR: &str = "runtime_error";
}

// =============================================================================
// API VERSIONING
// =============================================================================

/// API base path
pub const API_BASE_PATH: &str = "/api/v1";

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for paginated results
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Maximum page size for paginated results
pub const MAX_PAGE_SIZE: u32 = 100;

// =============================================================================
// VALIDATION
// =============================================================================

/// Maximum source code size in bytes (1 MB)
pub const MAX_SOURCE_CODE_SIZE: usize = 1024 * 1024;

/// Maximum HTTP request body; leaves room for JSON escaping of the source
pub const MAX_REQUEST_BODY_SIZE: usize = 4 * MAX_SOURCE_CODE_SIZE;
