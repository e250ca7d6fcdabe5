//! Problem model
//!
//! Problems are authored elsewhere; the judging pipeline only reads the
//! limits and the language allow-list.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Language;
use crate::constants::{DEFAULT_MEMORY_LIMIT_KB, DEFAULT_TIME_LIMIT_MS};

/// Problem database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Problem {
    pub id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    pub time_limit_ms: i32,
    pub memory_limit_kb: i32,
    pub allowed_languages: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Problem {
    /// Wall-clock limit per test case; unset limits fall back to the default
    pub fn time_limit(&self) -> Duration {
        let ms = if self.time_limit_ms > 0 {
            self.time_limit_ms
        } else {
            DEFAULT_TIME_LIMIT_MS
        };
        Duration::from_millis(ms as u64)
    }

    pub fn memory_limit_kb(&self) -> i64 {
        if self.memory_limit_kb > 0 {
            i64::from(self.memory_limit_kb)
        } else {
            i64::from(DEFAULT_MEMORY_LIMIT_KB)
        }
    }

    /// Whether submissions in `language` are accepted for this problem
    pub fn allows(&self, language: Language) -> bool {
        self.allowed_languages
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(language.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(allowed: &[&str]) -> Problem {
        Problem {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            title: "Two Sum".to_string(),
            time_limit_ms: 1500,
            memory_limit_kb: 262_144,
            allowed_languages: allowed.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_allows_language() {
        let p = problem(&["python", "CPP"]);
        assert!(p.allows(Language::Python));
        assert!(p.allows(Language::Cpp));
        assert!(!p.allows(Language::Java));
    }

    #[test]
    fn test_limits_fall_back_to_defaults() {
        let mut p = problem(&[]);
        assert_eq!(p.time_limit(), Duration::from_millis(1500));
        assert_eq!(p.memory_limit_kb(), 262_144);

        p.time_limit_ms = 0;
        p.memory_limit_kb = -1;
        assert_eq!(p.time_limit(), Duration::from_millis(DEFAULT_TIME_LIMIT_MS as u64));
        assert_eq!(p.memory_limit_kb(), i64::from(DEFAULT_MEMORY_LIMIT_KB));
    }
}
