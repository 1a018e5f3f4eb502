//! Explicit transaction implementation.

use super::TransactionState;
use crate::error::{CoreError, CoreResult};
use crate::types::TransactionId;
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle of an explicit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepting work. Commit and rollback leave the transaction active.
    Active,
    /// Closed; every further operation fails.
    Closed,
}

struct Inner {
    status: TransactionStatus,
    states: HashMap<String, Arc<dyn TransactionState>>,
    properties: HashMap<String, Value>,
    authorizations: BTreeSet<String>,
}

/// An explicit transaction: a state bag, authorizations and properties.
///
/// Commit and rollback run every attached state's hook, then clear the
/// authorizations. The transaction stays usable until [`close`](Self::close).
pub struct DefaultTransaction {
    id: TransactionId,
    handle: String,
    inner: Mutex<Inner>,
}

impl DefaultTransaction {
    /// Creates a transaction with a fresh id.
    pub fn new() -> Self {
        let id = TransactionId::next();
        Self::with_handle(id, id.to_string())
    }

    /// Creates a transaction labelled `handle`.
    pub fn named(handle: impl Into<String>) -> Self {
        Self::with_handle(TransactionId::next(), handle.into())
    }

    fn with_handle(id: TransactionId, handle: String) -> Self {
        Self {
            id,
            handle,
            inner: Mutex::new(Inner {
                status: TransactionStatus::Active,
                states: HashMap::new(),
                properties: HashMap::new(),
                authorizations: BTreeSet::new(),
            }),
        }
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Human-readable label.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TransactionStatus {
        self.inner.lock().status
    }

    fn ensure_active(inner: &Inner) -> CoreResult<()> {
        match inner.status {
            TransactionStatus::Active => Ok(()),
            TransactionStatus::Closed => Err(CoreError::illegal_state("transaction is closed")),
        }
    }

    fn snapshot_states(&self) -> CoreResult<Vec<Arc<dyn TransactionState>>> {
        let inner = self.inner.lock();
        Self::ensure_active(&inner)?;
        Ok(inner.states.values().cloned().collect())
    }

    /// Authorizations held, in sorted order.
    pub fn authorizations(&self) -> CoreResult<Vec<String>> {
        let inner = self.inner.lock();
        Self::ensure_active(&inner)?;
        Ok(inner.authorizations.iter().cloned().collect())
    }

    /// True if `authorization` is held.
    pub fn has_authorization(&self, authorization: &str) -> bool {
        self.inner.lock().authorizations.contains(authorization)
    }

    /// Adds an authorization and forwards it to every attached state.
    pub fn add_authorization(&self, authorization: &str) -> CoreResult<()> {
        let states = {
            let mut inner = self.inner.lock();
            Self::ensure_active(&inner)?;
            inner.authorizations.insert(authorization.to_string());
            inner.states.values().cloned().collect::<Vec<_>>()
        };
        let mut first = None;
        for state in states {
            if let Err(e) = state.add_authorization(authorization) {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Attaches `state` under `key`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `key` is already in use.
    pub fn put_state(&self, key: &str, state: Arc<dyn TransactionState>) -> CoreResult<()> {
        {
            let mut inner = self.inner.lock();
            Self::ensure_active(&inner)?;
            if inner.states.contains_key(key) {
                return Err(CoreError::invalid_argument(format!(
                    "state '{key}' already attached to {}",
                    self.id
                )));
            }
            inner.states.insert(key.to_string(), state.clone());
        }
        state.set_transaction(Some(self.id))
    }

    /// The state attached under `key`.
    pub fn get_state(&self, key: &str) -> CoreResult<Option<Arc<dyn TransactionState>>> {
        let inner = self.inner.lock();
        Self::ensure_active(&inner)?;
        Ok(inner.states.get(key).cloned())
    }

    /// Detaches and returns the state under `key`.
    pub fn remove_state(&self, key: &str) -> CoreResult<Option<Arc<dyn TransactionState>>> {
        let removed = {
            let mut inner = self.inner.lock();
            Self::ensure_active(&inner)?;
            inner.states.remove(key)
        };
        if let Some(state) = &removed {
            state.set_transaction(None)?;
        }
        Ok(removed)
    }

    /// Sets a free-form property.
    pub fn put_property(&self, key: &str, value: Value) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        Self::ensure_active(&inner)?;
        inner.properties.insert(key.to_string(), value);
        Ok(())
    }

    /// Reads a property.
    pub fn property(&self, key: &str) -> CoreResult<Option<Value>> {
        let inner = self.inner.lock();
        Self::ensure_active(&inner)?;
        Ok(inner.properties.get(key).cloned())
    }

    /// Commits every attached state.
    pub fn commit(&self) -> CoreResult<()> {
        let states = self.snapshot_states()?;
        let errors: Vec<CoreError> = states.iter().filter_map(|s| s.commit().err()).collect();
        self.inner.lock().authorizations.clear();
        debug!(transaction = %self.id, states = states.len(), failures = errors.len(), "commit");
        combine("commit", errors)
    }

    /// Rolls back every attached state.
    pub fn rollback(&self) -> CoreResult<()> {
        let states = self.snapshot_states()?;
        let errors: Vec<CoreError> = states.iter().filter_map(|s| s.rollback().err()).collect();
        self.inner.lock().authorizations.clear();
        debug!(transaction = %self.id, states = states.len(), failures = errors.len(), "rollback");
        combine("rollback", errors)
    }

    /// Detaches every state and closes the transaction. Idempotent.
    pub fn close(&self) -> CoreResult<()> {
        let states = {
            let mut inner = self.inner.lock();
            if inner.status == TransactionStatus::Closed {
                return Ok(());
            }
            inner.status = TransactionStatus::Closed;
            inner.properties.clear();
            inner.authorizations.clear();
            std::mem::take(&mut inner.states)
        };
        let errors: Vec<CoreError> = states
            .values()
            .filter_map(|s| s.set_transaction(None).err())
            .collect();
        debug!(transaction = %self.id, "closed");
        combine("close", errors)
    }
}

/// One error passes through; several become a single I/O failure.
fn combine(operation: &str, mut errors: Vec<CoreError>) -> CoreResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        n => Err(CoreError::io_failure(format!(
            "{operation} encountered {n} problems, the first was: {}",
            errors[0]
        ))),
    }
}

impl Default for DefaultTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultTransaction")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::any::Any;

    #[derive(Default)]
    struct Recorder {
        calls: PlMutex<Vec<String>>,
        fail: bool,
    }

    impl Recorder {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn record(&self, call: String) -> CoreResult<()> {
            self.calls.lock().push(call);
            if self.fail {
                Err(CoreError::io_failure("state failed"))
            } else {
                Ok(())
            }
        }
    }

    impl TransactionState for Recorder {
        fn set_transaction(&self, transaction: Option<TransactionId>) -> CoreResult<()> {
            self.calls.lock().push(format!("set {transaction:?}"));
            Ok(())
        }
        fn add_authorization(&self, authorization: &str) -> CoreResult<()> {
            self.record(format!("auth {authorization}"))
        }
        fn commit(&self) -> CoreResult<()> {
            self.record("commit".into())
        }
        fn rollback(&self) -> CoreResult<()> {
            self.record("rollback".into())
        }
        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[test]
    fn ids_are_unique_and_explicit() {
        let a = DefaultTransaction::new();
        let b = DefaultTransaction::new();
        assert_ne!(a.id(), b.id());
        assert!(!a.id().is_auto_commit());
    }

    #[test]
    fn state_lifecycle() {
        let txn = DefaultTransaction::new();
        let state = Arc::new(Recorder::default());
        txn.put_state("s", state.clone()).unwrap();
        txn.add_authorization("token").unwrap();
        txn.commit().unwrap();
        txn.rollback().unwrap();
        txn.remove_state("s").unwrap();
        assert_eq!(
            state.calls(),
            vec![
                format!("set {:?}", Some(txn.id())),
                "auth token".to_string(),
                "commit".to_string(),
                "rollback".to_string(),
                "set None".to_string(),
            ]
        );
    }

    #[test]
    fn duplicate_state_key_is_rejected() {
        let txn = DefaultTransaction::new();
        txn.put_state("s", Arc::new(Recorder::default())).unwrap();
        assert!(matches!(
            txn.put_state("s", Arc::new(Recorder::default())),
            Err(CoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn commit_clears_authorizations() {
        let txn = DefaultTransaction::new();
        txn.add_authorization("a").unwrap();
        assert!(txn.has_authorization("a"));
        txn.commit().unwrap();
        assert!(txn.authorizations().unwrap().is_empty());
    }

    #[test]
    fn single_failure_is_returned_as_is() {
        let txn = DefaultTransaction::new();
        txn.put_state("bad", Arc::new(Recorder::failing())).unwrap();
        txn.put_state("good", Arc::new(Recorder::default())).unwrap();
        let err = txn.commit().unwrap_err();
        assert_eq!(err.to_string(), "I/O error: state failed");
    }

    #[test]
    fn several_failures_are_aggregated() {
        let txn = DefaultTransaction::new();
        let good = Arc::new(Recorder::default());
        txn.put_state("a", Arc::new(Recorder::failing())).unwrap();
        txn.put_state("b", Arc::new(Recorder::failing())).unwrap();
        txn.put_state("c", good.clone()).unwrap();
        let err = txn.rollback().unwrap_err();
        assert!(err.is_io_failure());
        assert!(err.to_string().contains("2 problems"));
        assert!(good.calls().contains(&"rollback".to_string()));
    }

    #[test]
    fn closed_transaction_rejects_work() {
        let txn = DefaultTransaction::new();
        let state = Arc::new(Recorder::default());
        txn.put_state("s", state.clone()).unwrap();
        txn.put_property("p", Value::Integer(1)).unwrap();
        txn.close().unwrap();
        txn.close().unwrap();
        assert_eq!(txn.status(), TransactionStatus::Closed);
        assert_eq!(state.calls().last().map(String::as_str), Some("set None"));
        assert!(matches!(txn.commit(), Err(CoreError::IllegalState { .. })));
        assert!(txn.property("p").is_err());
    }
}
