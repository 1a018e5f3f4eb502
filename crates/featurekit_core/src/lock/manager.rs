//! In-process lock table.

use super::FeatureLock;
use crate::cursor::{Delegating, RecordWriter};
use crate::error::{CoreError, CoreResult};
use crate::record::Record;
use crate::schema::RecordType;
use crate::transaction::{Transaction, TransactionState};
use crate::types::TransactionId;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// State key under which the manager tracks transaction locks.
const LOCK_STATE_KEY: &str = "lock-manager";

#[derive(Debug, Clone)]
struct LockEntry {
    authorization: String,
    duration: Duration,
    /// `None` never expires; used for transaction locks.
    expires: Option<Instant>,
    transaction: Option<TransactionId>,
}

impl LockEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires.map_or(true, |expires| now < expires)
    }
}

type LockTable = HashMap<(String, String), LockEntry>;

/// Drops every expired entry.
fn prune(table: &mut LockTable, now: Instant) {
    table.retain(|_, entry| entry.is_live(now));
}

fn key(type_name: &str, id: &str) -> (String, String) {
    (type_name.to_string(), id.to_string())
}

fn transaction_authorization(id: TransactionId) -> String {
    format!("{}:{id}", FeatureLock::TRANSACTION_AUTHORIZATION)
}

/// Lock table shared by every writer of a store.
///
/// Cloning shares the table. Expired locks are pruned on every access.
#[derive(Debug, Clone, Default)]
pub struct LockManager {
    table: Arc<Mutex<LockTable>>,
}

impl LockManager {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks record `id` of `type_name` with `lock`.
    ///
    /// Locking again under the same authorization refreshes the lock.
    ///
    /// # Errors
    ///
    /// `LockDenied` if a live lock is held under another authorization, or
    /// for a transaction lock requested under Auto-Commit.
    pub fn lock_record(
        &self,
        type_name: &str,
        id: &str,
        transaction: &Transaction,
        lock: &FeatureLock,
    ) -> CoreResult<()> {
        let now = Instant::now();
        let entry = if lock.is_transaction() {
            if transaction.is_auto_commit() {
                return Err(CoreError::lock_denied(
                    type_name,
                    id,
                    "transaction locks need an explicit transaction",
                ));
            }
            LockEntry {
                authorization: transaction_authorization(transaction.id()),
                duration: Duration::ZERO,
                expires: None,
                transaction: Some(transaction.id()),
            }
        } else {
            LockEntry {
                authorization: lock.authorization().to_string(),
                duration: lock.duration(),
                expires: now.checked_add(lock.duration()),
                transaction: None,
            }
        };

        // The release hook must be attached before the entry exists, or a
        // closed transaction would leave behind a lock nobody can release.
        if let Some(txn_id) = entry.transaction {
            self.attach(transaction, txn_id)?;
        }

        let mut table = self.table.lock();
        prune(&mut table, now);
        let key = key(type_name, id);
        if let Some(existing) = table.get(&key) {
            if existing.authorization != entry.authorization {
                return Err(CoreError::lock_denied(type_name, id, "already locked"));
            }
        }
        debug!(type_name, id, authorization = %entry.authorization, "locked");
        table.insert(key, entry);
        Ok(())
    }

    fn attach(&self, transaction: &Transaction, txn_id: TransactionId) -> CoreResult<()> {
        if transaction.get_state(LOCK_STATE_KEY)?.is_some() {
            return Ok(());
        }
        transaction.put_state(
            LOCK_STATE_KEY,
            Arc::new(TransactionLocks {
                table: Arc::clone(&self.table),
                transaction: txn_id,
            }),
        )
    }

    /// Unlocks record `id` of `type_name`.
    ///
    /// Unlocked or expired records are left alone.
    ///
    /// # Errors
    ///
    /// `LockDenied` unless the transaction holds the lock's authorization
    /// (Auto-Commit never does).
    pub fn unlock_record(
        &self,
        type_name: &str,
        id: &str,
        transaction: &Transaction,
        lock: &FeatureLock,
    ) -> CoreResult<()> {
        if transaction.is_auto_commit() {
            return Err(CoreError::lock_denied(
                type_name,
                id,
                "Auto-Commit cannot hold authorizations",
            ));
        }
        let authorization = if lock.is_transaction() {
            transaction_authorization(transaction.id())
        } else if transaction.has_authorization(lock.authorization()) {
            lock.authorization().to_string()
        } else {
            return Err(CoreError::lock_denied(
                type_name,
                id,
                "authorization not held by transaction",
            ));
        };

        let mut table = self.table.lock();
        prune(&mut table, Instant::now());
        let key = key(type_name, id);
        match table.get(&key) {
            None => Ok(()),
            Some(entry) if entry.authorization == authorization => {
                table.remove(&key);
                debug!(type_name, id, "unlocked");
                Ok(())
            }
            Some(_) => Err(CoreError::lock_denied(
                type_name,
                id,
                "locked under another authorization",
            )),
        }
    }

    /// True if record `id` of `type_name` holds a live lock.
    pub fn is_locked(&self, type_name: &str, id: &str) -> bool {
        let mut table = self.table.lock();
        prune(&mut table, Instant::now());
        table.contains_key(&key(type_name, id))
    }

    /// Checks that `transaction` may modify record `id` of `type_name`.
    ///
    /// # Errors
    ///
    /// `LockDenied` when a live lock is held under an authorization the
    /// transaction does not have.
    pub fn assert_access(&self, type_name: &str, id: &str, transaction: &Transaction) -> CoreResult<()> {
        let mut table = self.table.lock();
        prune(&mut table, Instant::now());
        let Some(entry) = table.get(&key(type_name, id)) else {
            return Ok(());
        };
        let allowed = match entry.transaction {
            Some(owner) => owner == transaction.id(),
            None => transaction.has_authorization(&entry.authorization),
        };
        if allowed {
            Ok(())
        } else {
            Err(CoreError::lock_denied(type_name, id, "locked by another transaction"))
        }
    }

    /// Restarts the duration of every live lock held under `authorization`.
    ///
    /// Returns whether any lock matched.
    pub fn refresh(&self, authorization: &str, transaction: &Transaction) -> CoreResult<bool> {
        Self::require(authorization, transaction)?;
        let now = Instant::now();
        let mut table = self.table.lock();
        prune(&mut table, now);
        let mut found = false;
        for entry in table.values_mut() {
            if entry.authorization == authorization {
                entry.expires = now.checked_add(entry.duration);
                found = true;
            }
        }
        debug!(authorization, found, "locks refreshed");
        Ok(found)
    }

    /// Releases every lock held under `authorization`.
    ///
    /// Returns whether any lock matched.
    pub fn release(&self, authorization: &str, transaction: &Transaction) -> CoreResult<bool> {
        Self::require(authorization, transaction)?;
        let mut table = self.table.lock();
        prune(&mut table, Instant::now());
        let before = table.len();
        table.retain(|_, entry| entry.authorization != authorization);
        let found = table.len() != before;
        debug!(authorization, found, "locks released");
        Ok(found)
    }

    /// True if a live lock is held under `authorization`.
    pub fn exists(&self, authorization: &str) -> bool {
        let mut table = self.table.lock();
        prune(&mut table, Instant::now());
        table.values().any(|entry| entry.authorization == authorization)
    }

    /// Number of live locks in the table.
    pub fn len(&self) -> usize {
        let mut table = self.table.lock();
        prune(&mut table, Instant::now());
        table.len()
    }

    /// True if no live lock is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wraps `writer` so every write and remove first checks locks.
    pub fn checked_writer<W: RecordWriter>(&self, writer: W, transaction: &Transaction) -> CheckedWriter<W> {
        CheckedWriter {
            inner: writer,
            manager: self.clone(),
            transaction: transaction.clone(),
        }
    }

    fn require(authorization: &str, transaction: &Transaction) -> CoreResult<()> {
        if transaction.has_authorization(authorization) {
            Ok(())
        } else {
            Err(CoreError::lock_denied(
                "*",
                "*",
                format!("authorization {authorization} not held by transaction"),
            ))
        }
    }
}

/// Releases a transaction's locks when it commits, rolls back or closes.
struct TransactionLocks {
    table: Arc<Mutex<LockTable>>,
    transaction: TransactionId,
}

impl TransactionLocks {
    fn release(&self) {
        let id = self.transaction;
        self.table.lock().retain(|_, entry| entry.transaction != Some(id));
        debug!(transaction = %id, "transaction locks released");
    }
}

impl TransactionState for TransactionLocks {
    fn set_transaction(&self, transaction: Option<TransactionId>) -> CoreResult<()> {
        if transaction.is_none() {
            self.release();
        }
        Ok(())
    }

    fn add_authorization(&self, _authorization: &str) -> CoreResult<()> {
        Ok(())
    }

    fn commit(&self) -> CoreResult<()> {
        self.release();
        Ok(())
    }

    fn rollback(&self) -> CoreResult<()> {
        self.release();
        Ok(())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Writer decorator that refuses to touch records locked against its
/// transaction.
#[derive(Debug)]
pub struct CheckedWriter<W> {
    inner: W,
    manager: LockManager,
    transaction: Transaction,
}

impl<W: RecordWriter> CheckedWriter<W> {
    fn check_current(&mut self) -> CoreResult<()> {
        let type_name = self.inner.record_type().name().to_string();
        match self.inner.current_mut() {
            Some(record) => {
                let id = record.id().value();
                self.manager.assert_access(&type_name, &id, &self.transaction)
            }
            None => Ok(()),
        }
    }
}

impl<W: RecordWriter> RecordWriter for CheckedWriter<W> {
    fn record_type(&self) -> &Arc<RecordType> {
        self.inner.record_type()
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        self.inner.has_next()
    }

    fn next(&mut self) -> CoreResult<&mut Record> {
        self.inner.next()
    }

    fn current_mut(&mut self) -> Option<&mut Record> {
        self.inner.current_mut()
    }

    fn write(&mut self) -> CoreResult<()> {
        self.check_current()?;
        self.inner.write()
    }

    fn remove(&mut self) -> CoreResult<()> {
        self.check_current()?;
        self.inner.remove()
    }

    fn close(&mut self) -> CoreResult<()> {
        self.inner.close()
    }
}

impl<W> Delegating for CheckedWriter<W> {
    type Inner = W;

    fn delegate(&self) -> &W {
        &self.inner
    }

    fn delegate_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}
