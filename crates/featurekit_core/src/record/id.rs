//! Record identifier.

use crate::error::{CoreError, CoreResult};
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

#[derive(Debug)]
struct IdState {
    value: String,
    rewritten: bool,
}

/// Shared identifier of a record.
///
/// A `RecordId` is a handle: clones refer to the same identifier, so when a
/// temporary id is rewritten to its permanent value at commit, every record,
/// filter and event holding a clone observes the new value. An identifier
/// may be rewritten exactly once.
///
/// Equality compares current values, not handles; use [`RecordId::ptr_eq`]
/// for identity.
#[derive(Clone)]
pub struct RecordId(Arc<RwLock<IdState>>);

impl RecordId {
    /// Creates a new identifier handle.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(IdState {
            value: value.into(),
            rewritten: false,
        })))
    }

    /// Returns the current value.
    #[must_use]
    pub fn value(&self) -> String {
        self.0.read().value.clone()
    }

    /// Returns true if the current value equals `other`.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0.read().value == other
    }

    /// Returns true once the identifier has been rewritten.
    #[must_use]
    pub fn is_rewritten(&self) -> bool {
        self.0.read().rewritten
    }

    /// Replaces the value in place, visible through every clone.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` if the identifier was already rewritten.
    pub fn rewrite(&self, value: impl Into<String>) -> CoreResult<()> {
        let mut state = self.0.write();
        if state.rewritten {
            return Err(CoreError::illegal_state(format!(
                "identifier '{}' was already rewritten",
                state.value
            )));
        }
        state.value = value.into();
        state.rewritten = true;
        Ok(())
    }

    /// Returns a weak handle that does not keep the identifier alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakRecordId {
        WeakRecordId(Arc::downgrade(&self.0))
    }

    /// Returns true if both handles refer to the same identifier.
    #[must_use]
    pub fn ptr_eq(a: &RecordId, b: &RecordId) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other) || self.0.read().value == other.0.read().value
    }
}

impl Eq for RecordId {}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0.read().value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.read().value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Non-owning handle to a [`RecordId`].
#[derive(Clone, Debug)]
pub struct WeakRecordId(Weak<RwLock<IdState>>);

impl WeakRecordId {
    /// Returns the identifier if something still holds it.
    #[must_use]
    pub fn upgrade(&self) -> Option<RecordId> {
        self.0.upgrade().map(RecordId)
    }

    /// Returns true while at least one strong handle exists.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }
}
