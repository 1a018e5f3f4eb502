//! Records (features) and their identifiers.

mod id;

pub use id::{RecordId, WeakRecordId};

use crate::envelope::Envelope;
use crate::error::{CoreError, CoreResult};
use crate::schema::RecordType;
use crate::value::Value;
use std::sync::Arc;

/// One row bound to a record type and an identifier.
///
/// Values are validated against the record type on construction and on
/// every [`Record::set`]. Cloning a record copies its values but shares its
/// identifier handle.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    record_type: Arc<RecordType>,
    values: Vec<Value>,
}

impl Record {
    /// Creates a validated record.
    pub fn new(record_type: Arc<RecordType>, id: RecordId, values: Vec<Value>) -> CoreResult<Self> {
        record_type.validate(&values)?;
        Ok(Self {
            id,
            record_type,
            values,
        })
    }

    /// Creates a record with every value `Null`.
    ///
    /// Required columns are not checked until the record is written.
    #[must_use]
    pub fn blank(record_type: Arc<RecordType>, id: RecordId) -> Self {
        let values = vec![Value::Null; record_type.column_count()];
        Self {
            id,
            record_type,
            values,
        }
    }

    /// The identifier handle.
    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// The record type.
    #[must_use]
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    /// All values in column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the record, returning its values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> CoreResult<&Value> {
        self.values
            .get(index)
            .ok_or_else(|| CoreError::out_of_range(index, self.values.len()))
    }

    /// Value of the column called `name`.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.record_type
            .index_of(name)
            .and_then(|index| self.values.get(index))
    }

    /// Replaces the value at `index` after checking it against the column.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> CoreResult<()> {
        let value = value.into();
        self.record_type.column(index)?.check(&value)?;
        self.values[index] = value;
        Ok(())
    }

    /// Replaces the value of the column called `name`.
    pub fn set_by_name(&mut self, name: &str, value: impl Into<Value>) -> CoreResult<()> {
        let index = self.record_type.index_of(name).ok_or_else(|| {
            CoreError::invalid_argument(format!(
                "{} has no column '{name}'",
                self.record_type.name()
            ))
        })?;
        self.set(index, value)
    }

    /// Replaces every value from `values`, validating the full row.
    pub fn set_values(&mut self, values: Vec<Value>) -> CoreResult<()> {
        self.record_type.validate(&values)?;
        self.values = values;
        Ok(())
    }

    /// Checks the current values against the record type.
    pub fn validate(&self) -> CoreResult<()> {
        self.record_type.validate(&self.values)
    }

    /// Union of every extent value; null when the record has none.
    #[must_use]
    pub fn bounds(&self) -> Envelope {
        self.values
            .iter()
            .filter_map(Value::as_extent)
            .fold(Envelope::null(), |acc, e| acc.union(e))
    }
}
