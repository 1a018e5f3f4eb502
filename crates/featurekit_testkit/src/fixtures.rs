//! Test fixtures and store helpers.
//!
//! The road dataset has a required name, a lane count and an extent per
//! road, laid out along the x axis so extents are easy to predict.

use featurekit_core::{ColumnDescriptor, Config, Envelope, RecordType, Transaction, Value, ValueKind};
use featurekit_memory::MemoryStore;

/// Name of the road record type.
pub const ROAD: &str = "road";

/// The road record type: `name` (required text), `lanes`, `extent`.
pub fn road_type() -> RecordType {
    RecordType::new(
        ROAD,
        vec![
            ColumnDescriptor::new("name", ValueKind::Text).required(),
            ColumnDescriptor::new("lanes", ValueKind::Integer),
            ColumnDescriptor::new("extent", ValueKind::Extent),
        ],
    )
}

/// A road row. Road `i` spans `[i, i + 1]` on both axes.
pub fn road_row(name: &str, lanes: i64, i: u32) -> Vec<Value> {
    let min = f64::from(i);
    vec![
        Value::from(name),
        Value::Integer(lanes),
        Value::from(Envelope::new(min, min + 1.0, min, min + 1.0)),
    ]
}

/// Three roads: `r1`, `r2` and `r3`.
pub fn road_rows() -> Vec<Vec<Value>> {
    vec![
        road_row("r1", 2, 0),
        road_row("r2", 4, 1),
        road_row("r3", 1, 2),
    ]
}

/// A store preloaded with the road dataset.
pub struct TestStore {
    /// The store instance.
    pub store: MemoryStore,
}

impl TestStore {
    /// Creates a store holding the committed road dataset.
    pub fn roads() -> Self {
        Self::roads_with_config(Config::default())
    }

    /// Creates a road store with a custom configuration.
    pub fn roads_with_config(config: Config) -> Self {
        let store = MemoryStore::new(config);
        store
            .create_type(road_type())
            .expect("Failed to create road type");
        store
            .add_records(ROAD, road_rows(), &Transaction::auto_commit())
            .expect("Failed to load road rows");
        Self { store }
    }

    /// Creates a store with the road type but no rows.
    pub fn empty() -> Self {
        let store = MemoryStore::default();
        store
            .create_type(road_type())
            .expect("Failed to create road type");
        Self { store }
    }
}

impl std::ops::Deref for TestStore {
    type Target = MemoryStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test against a fresh road store.
pub fn with_road_store<F, R>(f: F) -> R
where
    F: FnOnce(&MemoryStore) -> R,
{
    let test_store = TestStore::roads();
    f(&test_store.store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn road_store_is_loaded() {
        let store = TestStore::roads();
        assert_eq!(store.count(ROAD).unwrap(), 3);
        assert_eq!(TestStore::empty().count(ROAD).unwrap(), 0);
    }

    #[test]
    fn road_rows_are_valid() {
        let t = road_type();
        for row in road_rows() {
            t.validate(&row).unwrap();
        }
    }
}
