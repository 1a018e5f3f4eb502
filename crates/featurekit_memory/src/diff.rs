//! Uncommitted changes of one record type in one transaction.

use crate::table::{StoredRow, Tables};
use featurekit_core::{
    CoreError, CoreResult, ListenerRegistry, RecordId, TransactionId, TransactionState, Value,
};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A row added in the transaction. The handle is shared with the writer
/// and the batch event, so commit can rewrite it in place.
#[derive(Debug, Clone)]
pub(crate) struct AddedRow {
    pub id: RecordId,
    pub values: Vec<Value>,
}

/// Pending changes, applied on commit.
#[derive(Debug, Default)]
pub(crate) struct Diff {
    pub added: Vec<AddedRow>,
    pub modified: HashMap<String, Vec<Value>>,
    pub removed: HashSet<String>,
}

impl Diff {
    pub fn add(&mut self, id: RecordId, values: Vec<Value>) {
        self.added.push(AddedRow { id, values });
    }

    /// Updates row `id`, whether it was added in this transaction or committed.
    pub fn modify(&mut self, id: &str, values: Vec<Value>) {
        match self.added.iter_mut().find(|row| row.id.matches(id)) {
            Some(row) => row.values = values,
            None => {
                self.modified.insert(id.to_string(), values);
            }
        }
    }

    pub fn remove(&mut self, id: &str) {
        if let Some(p) = self.added.iter().position(|row| row.id.matches(id)) {
            self.added.remove(p);
            return;
        }
        self.modified.remove(id);
        self.removed.insert(id.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

/// Transaction state holding the [`Diff`] of one record type.
///
/// Attached to the transaction under [`DiffState::key`]. Commit gives every
/// added row a permanent identifier, applies the diff to the committed
/// table and announces the batch; rollback discards the diff.
pub struct DiffState {
    type_name: String,
    tables: Tables,
    registry: Arc<ListenerRegistry>,
    transaction: Mutex<Option<TransactionId>>,
    diff: Mutex<Diff>,
}

impl DiffState {
    pub(crate) fn new(type_name: &str, tables: Tables, registry: Arc<ListenerRegistry>) -> Self {
        Self {
            type_name: type_name.to_string(),
            tables,
            registry,
            transaction: Mutex::new(None),
            diff: Mutex::new(Diff::default()),
        }
    }

    /// Transaction state key for `type_name`.
    pub fn key(type_name: &str) -> String {
        format!("memory:{type_name}")
    }

    /// Record type whose changes are held.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// True when no change is pending.
    pub fn is_empty(&self) -> bool {
        self.diff.lock().is_empty()
    }

    /// Runs `f` against the pending changes.
    pub(crate) fn with_diff<R>(&self, f: impl FnOnce(&mut Diff) -> R) -> R {
        f(&mut self.diff.lock())
    }

    fn transaction(&self) -> CoreResult<TransactionId> {
        let transaction = *self.transaction.lock();
        transaction.ok_or_else(|| CoreError::illegal_state("diff is not attached to a transaction"))
    }
}

impl TransactionState for DiffState {
    fn set_transaction(&self, transaction: Option<TransactionId>) -> CoreResult<()> {
        let mut current = self.transaction.lock();
        if transaction.is_none() {
            *self.diff.lock() = Diff::default();
            if let Some(previous) = *current {
                self.registry.discard_batch(&self.type_name, previous);
            }
        }
        *current = transaction;
        Ok(())
    }

    fn add_authorization(&self, _authorization: &str) -> CoreResult<()> {
        Ok(())
    }

    fn commit(&self) -> CoreResult<()> {
        let txn = self.transaction()?;
        let diff = std::mem::take(&mut *self.diff.lock());
        {
            let mut tables = self.tables.write();
            let table = tables
                .get_mut(&self.type_name)
                .ok_or_else(|| CoreError::io_failure(format!("{} was dropped", self.type_name)))?;

            for id in &diff.removed {
                table.remove(id);
            }
            for (id, values) in diff.modified {
                table.update(&id, values);
            }
            for row in diff.added {
                let temporary = row.id.value();
                let permanent = table.permanent_id();
                let tracked =
                    self.registry
                        .replace_identifier(&self.type_name, txn, &temporary, &permanent)?;
                if !tracked && !row.id.is_rewritten() {
                    row.id.rewrite(permanent)?;
                }
                table.rows.push(StoredRow {
                    id: row.id.value(),
                    values: row.values,
                });
            }
        }
        debug!(type_name = %self.type_name, transaction = %txn, "diff committed");
        self.registry.fire_commit(&self.type_name, txn);
        Ok(())
    }

    fn rollback(&self) -> CoreResult<()> {
        let txn = self.transaction()?;
        *self.diff.lock() = Diff::default();
        debug!(type_name = %self.type_name, transaction = %txn, "diff discarded");
        self.registry.fire_rollback(&self.type_name, txn);
        Ok(())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
