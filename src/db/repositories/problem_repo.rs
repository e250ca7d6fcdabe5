//! Problem repository

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Problem, TestCase},
};

/// Repository for problem database operations
pub struct ProblemRepository;

impl ProblemRepository {
    /// Find problem by ID
    pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: &Uuid) -> AppResult<Option<Problem>> {
        let problem = sqlx::query_as::<_, Problem>(r#"SELECT * FROM problems WHERE id = $1"#)
            .bind(id)
            .fetch_optional(db)
            .await?;

        Ok(problem)
    }

    /// Get test cases for a problem
    pub async fn get_test_cases<'e>(
        db: impl PgExecutor<'e>,
        problem_id: &Uuid,
    ) -> AppResult<Vec<TestCase>> {
        let test_cases = sqlx::query_as::<_, TestCase>(
            r#"SELECT * FROM test_cases WHERE problem_id = $1 ORDER BY order_index, created_at"#,
        )
        .bind(problem_id)
        .fetch_all(db)
        .await?;

        Ok(test_cases)
    }
}
