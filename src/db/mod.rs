//! Database module
//!
//! The grading pipeline talks to storage through the traits in [`store`].
//! [`PgStore`] implements them on Postgres through the repositories;
//! [`MemoryStore`] keeps everything in process for tests and demo mode.

pub mod memory;
pub mod pg;
pub mod repositories;
pub mod store;

use sqlx::{PgPool, postgres::PgPoolOptions};

pub use memory::MemoryStore;
pub use pg::PgStore;
pub use store::*;

/// Connect to Postgres
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
