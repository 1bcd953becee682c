//! Database layer for ER-Match Engine.
//!
//! Thin sqlx/Postgres repositories over the hospital feed tables, dialogue
//! sessions and search logs. Capacity data is written by an external
//! ingestion job on its own cadence; everything here treats it as
//! read-only, eventually-consistent input.

pub mod error;
pub mod hospital_repository;
pub mod models;
pub mod search_log_repository;
pub mod session_repository;
pub mod user_repository;

pub use error::{DatabaseError, DatabaseResult};
pub use hospital_repository::HospitalRepository;
pub use models::*;
pub use search_log_repository::SearchLogRepository;
pub use session_repository::SessionRepository;
pub use user_repository::UserRepository;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

/// Build the shared connection pool.
pub async fn connect(database_url: &str, max_connections: u32) -> DatabaseResult<Pool<Postgres>> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    Ok(pool)
}
