//! Error types for the in-memory store.

use featurekit_core::CoreError;
use thiserror::Error;

/// Result type for store operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors raised by [`MemoryStore`](crate::MemoryStore).
#[derive(Debug, Error)]
pub enum MemoryError {
    /// No record type with this name exists.
    #[error("unknown record type: {0}")]
    UnknownType(String),

    /// A record type with this name already exists.
    #[error("record type already exists: {0}")]
    DuplicateType(String),

    /// Error from a cursor, writer, transaction or lock.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl MemoryError {
    /// True if the error was caused by a record lock.
    #[must_use]
    pub fn is_lock_denied(&self) -> bool {
        matches!(self, Self::Core(CoreError::LockDenied { .. }))
    }
}

impl From<MemoryError> for CoreError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::Core(inner) => inner,
            MemoryError::UnknownType(_) | MemoryError::DuplicateType(_) => {
                CoreError::invalid_argument(err.to_string())
            }
        }
    }
}
