//! Column descriptors and record types.
//!
//! The schema model is deliberately small: a record type is a name plus an
//! ordered list of columns, and a column is a name, a value kind and a
//! nillability flag. Columns are addressed by position.

use crate::error::{CoreError, CoreResult};
use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Describes one column of a cursor or record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    name: String,
    kind: ValueKind,
    nillable: bool,
}

impl ColumnDescriptor {
    /// Creates a nillable column.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nillable: true,
        }
    }

    /// Marks the column as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.nillable = false;
        self
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value kind.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Whether `Null` is accepted.
    #[must_use]
    pub fn is_nillable(&self) -> bool {
        self.nillable
    }

    /// Checks a single value against this column.
    pub fn check(&self, value: &Value) -> CoreResult<()> {
        match value.kind() {
            None if self.nillable => Ok(()),
            None => Err(CoreError::illegal_record(format!(
                "column '{}' is not nillable",
                self.name
            ))),
            Some(kind) if self.kind.accepts(kind) => Ok(()),
            Some(kind) => Err(CoreError::illegal_record(format!(
                "column '{}' expects {}, got {}",
                self.name, self.kind, kind
            ))),
        }
    }
}

/// A named, ordered set of columns that records are validated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordType {
    name: String,
    columns: Vec<ColumnDescriptor>,
}

impl RecordType {
    /// Name used for types derived from bare cursor columns.
    pub const ANONYMOUS: &'static str = "<anonymous>";

    /// Creates a record type.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Creates a shared record type.
    pub fn shared(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Arc<Self> {
        Arc::new(Self::new(name, columns))
    }

    /// Type name; also the namespace for record identifiers.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column at `index`.
    pub fn column(&self, index: usize) -> CoreResult<&ColumnDescriptor> {
        self.columns
            .get(index)
            .ok_or_else(|| CoreError::out_of_range(index, self.columns.len()))
    }

    /// All columns in order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Position of the column called `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Validates a full row of values.
    pub fn validate(&self, values: &[Value]) -> CoreResult<()> {
        if values.len() != self.columns.len() {
            return Err(CoreError::illegal_record(format!(
                "{} expects {} values, got {}",
                self.name,
                self.columns.len(),
                values.len()
            )));
        }
        for (column, value) in self.columns.iter().zip(values) {
            column.check(value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road() -> RecordType {
        RecordType::new(
            "road",
            vec![
                ColumnDescriptor::new("id", ValueKind::Integer).required(),
                ColumnDescriptor::new("name", ValueKind::Text),
            ],
        )
    }

    #[test]
    fn validate_accepts_matching_row() {
        road()
            .validate(&[Value::Integer(1), Value::from("r1")])
            .unwrap();
        road().validate(&[Value::Integer(1), Value::Null]).unwrap();
    }

    #[test]
    fn validate_rejects_arity() {
        let err = road().validate(&[Value::Integer(1)]).unwrap_err();
        assert!(matches!(err, CoreError::IllegalRecord { .. }));
    }

    #[test]
    fn validate_rejects_null_in_required_column() {
        let err = road().validate(&[Value::Null, Value::Null]).unwrap_err();
        assert!(matches!(err, CoreError::IllegalRecord { .. }));
    }

    #[test]
    fn validate_never_coerces() {
        let err = road()
            .validate(&[Value::Float(1.0), Value::Null])
            .unwrap_err();
        assert!(err.to_string().contains("expects integer, got float"));
    }

    #[test]
    fn column_lookup() {
        let t = road();
        assert_eq!(t.index_of("name"), Some(1));
        assert_eq!(t.index_of("geom"), None);
        assert!(matches!(
            t.column(2),
            Err(CoreError::OutOfRange { index: 2, len: 2 })
        ));
    }
}
