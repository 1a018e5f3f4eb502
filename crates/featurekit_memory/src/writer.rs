//! Attribute writer over the in-memory tables.

use crate::diff::DiffState;
use crate::table::Tables;
use featurekit_core::cursor::{AttributeWriter, CloseSignal};
use featurekit_core::{ColumnDescriptor, CoreError, CoreResult, RecordId, Value};
use std::sync::Arc;
use tracing::debug;

/// Where persisted rows go.
#[derive(Clone)]
pub(crate) enum Target {
    /// Auto-Commit: straight into the committed table.
    Direct(Tables),
    /// Explicit transaction: into its diff.
    Diff(Arc<DiffState>),
}

/// [`AttributeWriter`] over a snapshot of the rows visible to a transaction.
///
/// Existing rows are visited in order; once they run out `advance()` opens
/// a fresh row that `write_row()` appends.
pub struct MemoryAttributeWriter {
    type_name: String,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<(String, Vec<Value>)>,
    position: Option<usize>,
    current: Vec<Value>,
    appending: bool,
    target: Target,
    signal: CloseSignal,
}

impl MemoryAttributeWriter {
    pub(crate) fn new(
        type_name: &str,
        columns: Vec<ColumnDescriptor>,
        rows: Vec<(String, Vec<Value>)>,
        target: Target,
    ) -> Self {
        Self {
            type_name: type_name.to_string(),
            columns,
            rows,
            position: None,
            current: Vec::new(),
            appending: false,
            target,
            signal: CloseSignal::new(),
        }
    }

    /// Signal that closes this writer from any thread.
    pub fn close_signal(&self) -> CloseSignal {
        self.signal.clone()
    }

    fn check_open(&self) -> CoreResult<()> {
        self.signal.check("memory writer")
    }

    fn next_index(&self) -> usize {
        self.position.map_or(0, |p| p + 1)
    }

    fn current_row(&self) -> CoreResult<Option<&str>> {
        if self.appending {
            return Ok(None);
        }
        let position = self
            .position
            .ok_or_else(|| CoreError::illegal_state("advance() must be called first"))?;
        Ok(self.rows.get(position).map(|(id, _)| id.as_str()))
    }

    fn persist(&mut self, id: &RecordId) -> CoreResult<()> {
        let values = self.current.clone();
        match &self.target {
            Target::Direct(tables) => {
                let mut tables = tables.write();
                let table = tables
                    .get_mut(&self.type_name)
                    .ok_or_else(|| CoreError::io_failure(format!("{} was dropped", self.type_name)))?;
                if self.appending {
                    if !id.is_rewritten() {
                        id.rewrite(table.permanent_id())?;
                    }
                    table.rows.push(crate::table::StoredRow {
                        id: id.value(),
                        values,
                    });
                } else if !table.update(&id.value(), values) {
                    return Err(CoreError::io_failure(format!(
                        "record {id} of {} no longer exists",
                        self.type_name
                    )));
                }
            }
            Target::Diff(state) => {
                let appending = self.appending;
                state.with_diff(|diff| {
                    if appending {
                        diff.add(id.clone(), values);
                    } else {
                        diff.modify(&id.value(), values);
                    }
                });
            }
        }
        Ok(())
    }
}

impl AttributeWriter for MemoryAttributeWriter {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_at(&self, index: usize) -> CoreResult<&ColumnDescriptor> {
        self.columns
            .get(index)
            .ok_or_else(|| CoreError::out_of_range(index, self.columns.len()))
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        self.check_open()?;
        Ok(!self.appending && self.next_index() < self.rows.len())
    }

    fn advance(&mut self) -> CoreResult<()> {
        self.check_open()?;
        let next = self.next_index();
        if !self.appending && next < self.rows.len() {
            self.position = Some(next);
            self.current = self.rows[next].1.clone();
            self.current.resize(self.columns.len(), Value::Null);
        } else {
            self.appending = true;
            self.current = vec![Value::Null; self.columns.len()];
        }
        Ok(())
    }

    fn read(&mut self, index: usize) -> CoreResult<Value> {
        self.check_open()?;
        self.current
            .get(index)
            .cloned()
            .ok_or_else(|| CoreError::out_of_range(index, self.columns.len()))
    }

    fn read_id(&mut self) -> CoreResult<Option<String>> {
        self.check_open()?;
        Ok(self.current_row()?.map(str::to_string))
    }

    fn write(&mut self, index: usize, value: Value) -> CoreResult<()> {
        self.check_open()?;
        let len = self.columns.len();
        let slot = self
            .current
            .get_mut(index)
            .ok_or_else(|| CoreError::out_of_range(index, len))?;
        *slot = value;
        Ok(())
    }

    fn write_row(&mut self, id: &RecordId) -> CoreResult<()> {
        self.check_open()?;
        self.persist(id)?;
        debug!(type_name = %self.type_name, id = %id, appended = self.appending, "row written");
        Ok(())
    }

    fn remove_row(&mut self) -> CoreResult<()> {
        self.check_open()?;
        let Some(id) = self.current_row()?.map(str::to_string) else {
            return Err(CoreError::illegal_state("no existing row to remove"));
        };
        match &self.target {
            Target::Direct(tables) => {
                if let Some(table) = tables.write().get_mut(&self.type_name) {
                    table.remove(&id);
                }
            }
            Target::Diff(state) => state.with_diff(|diff| diff.remove(&id)),
        }
        debug!(type_name = %self.type_name, id = %id, "row removed");
        Ok(())
    }

    fn close(&mut self) -> CoreResult<()> {
        self.signal.raise();
        self.rows.clear();
        self.current.clear();
        Ok(())
    }
}

impl std::fmt::Debug for MemoryAttributeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAttributeWriter")
            .field("type_name", &self.type_name)
            .field("rows", &self.rows.len())
            .field("position", &self.position)
            .field("appending", &self.appending)
            .finish()
    }
}
