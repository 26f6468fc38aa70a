//! Store error model.

use thiserror::Error;

/// Result type used across the persistence layer.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed voucher does not exist in this tenant scope.
    #[error("voucher not found")]
    NotFound,

    /// A uniqueness conflict, typically a concurrent number allocation.
    /// The posting path retries these a bounded number of times.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other backend failure (connection, statement, deserialization).
    /// The message is for logs; it must never reach an HTTP response body.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
