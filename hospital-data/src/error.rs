use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Concurrent update detected for session {0}")]
    VersionConflict(uuid::Uuid),

    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Invalid stored payload: {0}")]
    PayloadError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
