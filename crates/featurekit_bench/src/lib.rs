//! Benchmark utilities.

use featurekit_core::{ColumnDescriptor, Envelope, RecordType, Value, ValueKind};
use std::sync::Arc;

/// Columns of the benchmark record type: `name`, `rank`, `extent`.
pub fn columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("name", ValueKind::Text),
        ColumnDescriptor::new("rank", ValueKind::Integer),
        ColumnDescriptor::new("extent", ValueKind::Extent),
    ]
}

/// The benchmark record type.
pub fn record_type() -> Arc<RecordType> {
    RecordType::shared("parcel", columns())
}

/// Generate `count` rows with ranks `0..count` laid out along the diagonal.
pub fn generate_rows(count: usize) -> Vec<Vec<Value>> {
    (0..count)
        .map(|i| {
            let at = i as f64;
            vec![
                Value::Text(format!("parcel_{i}")),
                Value::Integer(i as i64),
                Value::Extent(Envelope::new(at, at + 1.0, at, at + 1.0)),
            ]
        })
        .collect()
}
