//! Error types for the outbox store library.

use thiserror::Error;

/// Result type alias for outbox operations.
pub type OutboxResult<T> = Result<T, OutboxError>;

/// Errors that can occur against the outbox, sequence, or checkpoint stores.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// The backing store could not be reached or timed out. Retryable.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    /// An entry with this sequence number already exists.
    #[error("duplicate sequence number: {0}")]
    Duplicate(i64),

    /// The retry budget for a publish attempt was exhausted.
    #[error("publish failed after retries: {0}")]
    PublishFailed(String),

    /// Payload failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OutboxError {
    /// Sequence allocator / outbox insert / poller read failures that are safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OutboxError::StoreUnavailable(_))
    }
}
