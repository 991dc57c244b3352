use thiserror::Error;

/// Errors that can occur when interacting with the ticket store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted row could not be decoded into a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<domain::UnknownState> for StoreError {
    fn from(err: domain::UnknownState) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
