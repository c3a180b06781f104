//! Error handling for the API.
//!
//! Storage backends report [`StoreError`], and everything above them reports
//! [`BarbellError`]. Resolvers return `async_graphql::Result`, which takes
//! either through their `Display` output, so the messages here are what the
//! front desk actually sees.

/// Failures raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key (email, transaction ID, one check-in per day) was violated.
    #[error("{0}")]
    Conflict(String),
    /// A change made inside the store broke a domain rule.
    #[error("{0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to access data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("data file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The error enum for all domain operations.
#[derive(Debug, thiserror::Error)]
pub enum BarbellError {
    /// The requested record does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The operation would break a uniqueness rule or an allowed transition.
    #[error("{0}")]
    Conflict(String),
    /// The input failed validation.
    #[error("{0}")]
    Invalid(String),
    /// A member photo could not be decoded or written.
    #[error("photo upload failed: {0}")]
    Photo(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for BarbellError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(message) => BarbellError::Conflict(message),
            StoreError::Invalid(message) => BarbellError::Invalid(message),
            other => BarbellError::Store(other),
        }
    }
}

pub type BarbellResult<T> = Result<T, BarbellError>;
pub type StoreResult<T> = Result<T, StoreError>;
