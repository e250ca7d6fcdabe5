//! Business logic services

pub mod grading_service;
pub mod leaderboard_service;
pub mod scoring;
pub mod submission_service;

pub use grading_service::GradingService;
pub use leaderboard_service::{LeaderboardPage, LeaderboardService};
pub use scoring::{GradeSummary, ScoreAggregator};
pub use submission_service::SubmissionService;
