use common::LearningPathId;
use thiserror::Error;

/// Errors that can occur when interacting with the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another live learning path already uses this title.
    #[error("a learning path titled '{0}' already exists")]
    DuplicateTitle(String),

    /// The learning path does not exist (or is soft-deleted, for live-row operations).
    #[error("learning path not found: {0}")]
    NotFound(LearningPathId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns true for uniqueness violations the caller can fix by changing input.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::DuplicateTitle(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
