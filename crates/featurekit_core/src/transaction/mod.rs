//! Transactions.
//!
//! A [`Transaction`] is either Auto-Commit, where every change applies
//! immediately and nothing can be attached, or explicit, backed by a shared
//! [`DefaultTransaction`]. Backends attach a [`TransactionState`] to buffer
//! their changes until commit or rollback.
//!
//! ```rust
//! use featurekit_core::{CoreError, Transaction};
//!
//! let auto = Transaction::auto_commit();
//! assert!(auto.commit().is_ok());
//! assert!(matches!(auto.add_authorization("t"), Err(CoreError::Unsupported { .. })));
//!
//! let txn = Transaction::new();
//! txn.add_authorization("t").unwrap();
//! assert_eq!(txn.authorizations().unwrap(), vec!["t".to_string()]);
//! txn.commit().unwrap();
//! txn.close().unwrap();
//! ```

mod default;
mod state;

pub use default::{DefaultTransaction, TransactionStatus};
pub use state::TransactionState;

use crate::error::{CoreError, CoreResult};
use crate::types::TransactionId;
use crate::value::Value;
use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

fn unsupported(operation: &str) -> CoreError {
    CoreError::unsupported(format!("{operation} is not supported for Auto-Commit"))
}

/// Handle to a transaction. Cloning shares the same explicit transaction.
#[derive(Debug, Clone, Default)]
pub enum Transaction {
    /// Changes apply immediately; no state, authorizations or properties.
    #[default]
    AutoCommit,
    /// An explicit transaction.
    Explicit(Arc<DefaultTransaction>),
}

impl Transaction {
    /// The Auto-Commit transaction.
    pub const fn auto_commit() -> Self {
        Self::AutoCommit
    }

    /// Starts a new explicit transaction.
    pub fn new() -> Self {
        Self::Explicit(Arc::new(DefaultTransaction::new()))
    }

    /// Starts a new explicit transaction labelled `handle`.
    pub fn named(handle: impl Into<String>) -> Self {
        Self::Explicit(Arc::new(DefaultTransaction::named(handle)))
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> TransactionId {
        match self {
            Self::AutoCommit => TransactionId::AUTO_COMMIT,
            Self::Explicit(txn) => txn.id(),
        }
    }

    /// Human-readable label.
    pub fn handle(&self) -> &str {
        match self {
            Self::AutoCommit => "Auto-Commit",
            Self::Explicit(txn) => txn.handle(),
        }
    }

    /// True for Auto-Commit.
    pub fn is_auto_commit(&self) -> bool {
        matches!(self, Self::AutoCommit)
    }

    /// Authorizations held.
    pub fn authorizations(&self) -> CoreResult<Vec<String>> {
        match self {
            Self::AutoCommit => Err(unsupported("authorization")),
            Self::Explicit(txn) => txn.authorizations(),
        }
    }

    /// True if `authorization` is held. Always false for Auto-Commit.
    pub fn has_authorization(&self, authorization: &str) -> bool {
        match self {
            Self::AutoCommit => false,
            Self::Explicit(txn) => txn.has_authorization(authorization),
        }
    }

    /// Adds an authorization token, typically a lock's.
    pub fn add_authorization(&self, authorization: &str) -> CoreResult<()> {
        match self {
            Self::AutoCommit => Err(unsupported("authorization")),
            Self::Explicit(txn) => txn.add_authorization(authorization),
        }
    }

    /// Attaches `state` under `key`.
    pub fn put_state(&self, key: &str, state: Arc<dyn TransactionState>) -> CoreResult<()> {
        match self {
            Self::AutoCommit => Err(unsupported("state")),
            Self::Explicit(txn) => txn.put_state(key, state),
        }
    }

    /// The state attached under `key`.
    pub fn get_state(&self, key: &str) -> CoreResult<Option<Arc<dyn TransactionState>>> {
        match self {
            Self::AutoCommit => Err(unsupported("state")),
            Self::Explicit(txn) => txn.get_state(key),
        }
    }

    /// The state under `key`, if it has concrete type `T`.
    pub fn get_state_as<T: Any + Send + Sync>(&self, key: &str) -> CoreResult<Option<Arc<T>>> {
        Ok(self
            .get_state(key)?
            .and_then(|state| state.into_any().downcast::<T>().ok()))
    }

    /// Detaches and returns the state under `key`.
    pub fn remove_state(&self, key: &str) -> CoreResult<Option<Arc<dyn TransactionState>>> {
        match self {
            Self::AutoCommit => Err(unsupported("state")),
            Self::Explicit(txn) => txn.remove_state(key),
        }
    }

    /// Sets a free-form property.
    pub fn put_property(&self, key: &str, value: impl Into<Value>) -> CoreResult<()> {
        match self {
            Self::AutoCommit => Err(unsupported("property")),
            Self::Explicit(txn) => txn.put_property(key, value.into()),
        }
    }

    /// Reads a property.
    pub fn property(&self, key: &str) -> CoreResult<Option<Value>> {
        match self {
            Self::AutoCommit => Err(unsupported("property")),
            Self::Explicit(txn) => txn.property(key),
        }
    }

    /// Commits. A no-op for Auto-Commit.
    pub fn commit(&self) -> CoreResult<()> {
        match self {
            Self::AutoCommit => Ok(()),
            Self::Explicit(txn) => txn.commit(),
        }
    }

    /// Rolls back.
    ///
    /// # Errors
    ///
    /// `Io` for Auto-Commit, whose changes are already applied.
    pub fn rollback(&self) -> CoreResult<()> {
        match self {
            Self::AutoCommit => Err(CoreError::io_failure("cannot roll back auto-commit")),
            Self::Explicit(txn) => txn.rollback(),
        }
    }

    /// Closes the transaction. A no-op for Auto-Commit.
    pub fn close(&self) -> CoreResult<()> {
        match self {
            Self::AutoCommit => Ok(()),
            Self::Explicit(txn) => txn.close(),
        }
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Transaction {}

impl Hash for Transaction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    impl TransactionState for Marker {
        fn set_transaction(&self, _: Option<TransactionId>) -> CoreResult<()> {
            Ok(())
        }
        fn add_authorization(&self, _: &str) -> CoreResult<()> {
            Ok(())
        }
        fn commit(&self) -> CoreResult<()> {
            Ok(())
        }
        fn rollback(&self) -> CoreResult<()> {
            Ok(())
        }
        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[test]
    fn auto_commit_rejects_attachments() {
        let auto = Transaction::auto_commit();
        assert_eq!(auto.id(), TransactionId::AUTO_COMMIT);
        assert!(matches!(auto.authorizations(), Err(CoreError::Unsupported { .. })));
        assert!(matches!(auto.add_authorization("x"), Err(CoreError::Unsupported { .. })));
        assert!(matches!(auto.put_state("k", Arc::new(Marker)), Err(CoreError::Unsupported { .. })));
        assert!(matches!(auto.get_state("k"), Err(CoreError::Unsupported { .. })));
        assert!(matches!(auto.remove_state("k"), Err(CoreError::Unsupported { .. })));
        assert!(matches!(auto.put_property("k", 1i64), Err(CoreError::Unsupported { .. })));
        assert!(!auto.has_authorization("x"));
    }

    #[test]
    fn auto_commit_lifecycle() {
        let auto = Transaction::auto_commit();
        auto.commit().unwrap();
        auto.close().unwrap();
        let err = auto.rollback().unwrap_err();
        assert!(err.is_io_failure());
        assert!(err.to_string().contains("cannot roll back auto-commit"));
    }

    #[test]
    fn typed_state_lookup() {
        let txn = Transaction::new();
        txn.put_state("marker", Arc::new(Marker)).unwrap();
        assert!(txn.get_state_as::<Marker>("marker").unwrap().is_some());
        assert!(txn.get_state_as::<String>("marker").unwrap().is_none());
        assert!(txn.get_state_as::<Marker>("missing").unwrap().is_none());
    }

    #[test]
    fn clones_share_the_transaction() {
        let txn = Transaction::named("edit session");
        let clone = txn.clone();
        clone.put_property("user", "alice").unwrap();
        assert_eq!(txn.property("user").unwrap(), Some(Value::from("alice")));
        assert_eq!(txn, clone);
        assert_eq!(txn.handle(), "edit session");
        assert_ne!(txn, Transaction::new());
    }
}
