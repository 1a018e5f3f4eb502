//! Committed rows of every record type.

use crate::diff::Diff;
use featurekit_core::{RecordType, Value};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Tables keyed by record type name.
pub(crate) type Tables = Arc<RwLock<BTreeMap<String, Table>>>;

/// A committed row.
#[derive(Debug, Clone)]
pub(crate) struct StoredRow {
    pub id: String,
    pub values: Vec<Value>,
}

/// Committed rows of one record type, in insertion order.
#[derive(Debug)]
pub(crate) struct Table {
    pub record_type: Arc<RecordType>,
    pub rows: Vec<StoredRow>,
}

impl Table {
    pub fn new(record_type: Arc<RecordType>) -> Self {
        Self {
            record_type,
            rows: Vec::new(),
        }
    }

    /// A permanent identifier for a new row.
    pub fn permanent_id(&self) -> String {
        format!("{}.{}", self.record_type.name(), Uuid::new_v4())
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    /// Replaces the values of row `id`. Returns false if it does not exist.
    pub fn update(&mut self, id: &str, values: Vec<Value>) -> bool {
        match self.position(id) {
            Some(p) => {
                self.rows[p].values = values;
                true
            }
            None => false,
        }
    }

    /// Removes row `id`. Returns false if it does not exist.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(p) => {
                self.rows.remove(p);
                true
            }
            None => false,
        }
    }

    /// Committed rows with `diff` applied: removed rows skipped, modified
    /// rows replaced, added rows appended.
    pub fn visible_rows(&self, diff: Option<&Diff>) -> Vec<(String, Vec<Value>)> {
        let Some(diff) = diff else {
            return self
                .rows
                .iter()
                .map(|row| (row.id.clone(), row.values.clone()))
                .collect();
        };
        let committed = self
            .rows
            .iter()
            .filter(|row| !diff.removed.contains(&row.id))
            .map(|row| {
                let values = diff.modified.get(&row.id).unwrap_or(&row.values);
                (row.id.clone(), values.clone())
            });
        let added = diff
            .added
            .iter()
            .map(|row| (row.id.value(), row.values.clone()));
        committed.chain(added).collect()
    }
}
