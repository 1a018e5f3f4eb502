//! Core type definitions for featurekit.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide source of explicit transaction ids. Zero is reserved for Auto-Commit.
static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transaction.
///
/// Explicit transaction ids are monotonically increasing and never reused
/// within a process. [`TransactionId::AUTO_COMMIT`] identifies the
/// Auto-Commit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Id shared by every Auto-Commit handle.
    pub const AUTO_COMMIT: Self = Self(0);

    /// Creates a transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next explicit transaction id.
    pub(crate) fn next() -> Self {
        Self(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true for the Auto-Commit id.
    #[must_use]
    pub const fn is_auto_commit(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_auto_commit() {
            write!(f, "txn:auto-commit")
        } else {
            write!(f, "txn:{}", self.0)
        }
    }
}
