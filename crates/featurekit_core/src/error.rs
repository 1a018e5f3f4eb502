//! Error types for featurekit core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by cursors, writers, transactions and the lock manager.
///
/// `Io`, `Closed` and `LockDenied` form the I/O failure family: they come from the
/// backing store or from resources that are no longer usable. The remaining
/// variants signal protocol misuse and are never transient.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Backing store failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The cursor, writer or transaction has been closed.
    #[error("{resource} is closed")]
    Closed {
        /// What was closed.
        resource: &'static str,
    },

    /// Column or row position outside the valid range.
    #[error("position {index} out of range (0..{len})")]
    OutOfRange {
        /// Requested position.
        index: usize,
        /// Number of valid positions.
        len: usize,
    },

    /// Operation not valid in the current protocol state.
    #[error("illegal state: {message}")]
    IllegalState {
        /// Description of the misuse.
        message: String,
    },

    /// A value was rejected by the record type.
    #[error("illegal record: {message}")]
    IllegalRecord {
        /// Why the record was rejected.
        message: String,
    },

    /// Advanced past the last element.
    #[error("no such element: {message}")]
    NoSuchElement {
        /// Context for the exhausted cursor.
        message: String,
    },

    /// The capability does not exist for this object.
    #[error("unsupported operation: {message}")]
    Unsupported {
        /// The missing capability.
        message: String,
    },

    /// An argument was rejected before any work was done.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the bad argument.
        message: String,
    },

    /// A record lock prevented the operation.
    #[error("lock denied for {type_name}/{record_id}: {reason}")]
    LockDenied {
        /// Record type of the locked record.
        type_name: String,
        /// Identifier of the locked record.
        record_id: String,
        /// Why access was refused.
        reason: String,
    },
}

impl CoreError {
    /// Creates an I/O failure from a message.
    pub fn io_failure(message: impl Into<String>) -> Self {
        Self::Io(io::Error::new(io::ErrorKind::Other, message.into()))
    }

    /// Creates a closed-resource error.
    pub fn closed(resource: &'static str) -> Self {
        Self::Closed { resource }
    }

    /// Creates an out-of-range error.
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::OutOfRange { index, len }
    }

    /// Creates an illegal state error.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// Creates an illegal record error.
    pub fn illegal_record(message: impl Into<String>) -> Self {
        Self::IllegalRecord {
            message: message.into(),
        }
    }

    /// Creates a no-such-element error.
    pub fn no_such_element(message: impl Into<String>) -> Self {
        Self::NoSuchElement {
            message: message.into(),
        }
    }

    /// Creates an unsupported operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a lock denied error.
    pub fn lock_denied(
        type_name: impl Into<String>,
        record_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::LockDenied {
            type_name: type_name.into(),
            record_id: record_id.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for errors in the I/O failure family.
    #[must_use]
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Closed { .. } | Self::LockDenied { .. }
        )
    }
}
