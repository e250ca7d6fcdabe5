//! Campus Judge - submission grading for campus programming events
//!
//! Participants submit source code for an event problem. Each submission is
//! queued, run against the problem's test cases by an execution backend
//! (a remote Judge0-compatible service or a local process sandbox), scored
//! by test case weight and folded into the event leaderboard.
//!
//! # Architecture
//!
//! - **Handlers**: HTTP request handlers (thin layer)
//! - **Services**: intake, grading, scoring and leaderboard logic
//! - **Worker**: job queue, worker pool and recovery sweeper
//! - **Execution**: backends that run one program against one input
//! - **DB**: storage traits with Postgres and in-memory implementations

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod execution;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;
pub mod worker;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
