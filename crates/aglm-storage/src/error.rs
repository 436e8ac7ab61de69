use thiserror::Error;

/// Errors surfaced by the DAO. Query failures and a missing row are kept
/// distinct so callers can map `NotFound` to a 404 without inspecting driver
/// error text.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connection(String),

    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("task not found: {0}")]
    NotFound(String),
}
