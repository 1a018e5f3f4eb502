//! In-memory attribute cursor.

use super::{AttributeCursor, CloseSignal};
use crate::error::{CoreError, CoreResult};
use crate::schema::ColumnDescriptor;
use crate::value::Value;

/// An [`AttributeCursor`] over rows held in memory.
///
/// Suitable for tests, for joining in computed columns and for ephemeral
/// data. Rows shorter than the column list read as `Null` in the missing
/// positions.
#[derive(Debug)]
pub struct RowCursor {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<(Option<String>, Vec<Value>)>,
    position: Option<usize>,
    signal: CloseSignal,
}

impl RowCursor {
    /// Creates a cursor over anonymous rows.
    #[must_use]
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<Value>>) -> Self {
        Self::from_parts(columns, rows.into_iter().map(|row| (None, row)).collect())
    }

    /// Creates a cursor whose rows carry identifiers.
    #[must_use]
    pub fn with_ids(columns: Vec<ColumnDescriptor>, rows: Vec<(String, Vec<Value>)>) -> Self {
        Self::from_parts(
            columns,
            rows.into_iter().map(|(id, row)| (Some(id), row)).collect(),
        )
    }

    fn from_parts(columns: Vec<ColumnDescriptor>, rows: Vec<(Option<String>, Vec<Value>)>) -> Self {
        Self {
            columns,
            rows,
            position: None,
            signal: CloseSignal::new(),
        }
    }

    /// Signal that closes this cursor from any thread.
    #[must_use]
    pub fn close_signal(&self) -> CloseSignal {
        self.signal.clone()
    }

    fn next_index(&self) -> usize {
        self.position.map_or(0, |p| p + 1)
    }

    fn current(&self) -> CoreResult<&(Option<String>, Vec<Value>)> {
        self.signal.check("row cursor")?;
        let position = self
            .position
            .ok_or_else(|| CoreError::illegal_state("advance() must be called before read()"))?;
        self.rows
            .get(position)
            .ok_or_else(|| CoreError::no_such_element("row cursor is past its last row"))
    }
}

impl AttributeCursor for RowCursor {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_at(&self, index: usize) -> CoreResult<&ColumnDescriptor> {
        self.columns
            .get(index)
            .ok_or_else(|| CoreError::out_of_range(index, self.columns.len()))
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        self.signal.check("row cursor")?;
        Ok(self.next_index() < self.rows.len())
    }

    fn advance(&mut self) -> CoreResult<()> {
        self.signal.check("row cursor")?;
        let next = self.next_index();
        if next >= self.rows.len() {
            return Err(CoreError::no_such_element("row cursor has no more rows"));
        }
        self.position = Some(next);
        Ok(())
    }

    fn read(&mut self, index: usize) -> CoreResult<Value> {
        let len = self.columns.len();
        let (_, row) = self.current()?;
        if index >= len {
            return Err(CoreError::out_of_range(index, len));
        }
        Ok(row.get(index).cloned().unwrap_or(Value::Null))
    }

    fn read_id(&mut self) -> CoreResult<Option<String>> {
        Ok(self.current()?.0.clone())
    }

    fn close(&mut self) -> CoreResult<()> {
        self.signal.raise();
        self.rows.clear();
        Ok(())
    }
}
