use thiserror::Error;

/// Errors that can occur while recomputing availability.
#[derive(Debug, Error)]
pub enum AvailabilityError {
    /// The underlying store failed.
    #[error("store error: {0}")]
    Store(#[from] store::StoreError),
}

/// Result type for availability operations.
pub type Result<T> = std::result::Result<T, AvailabilityError>;
