//! The in-memory feature store.

use crate::diff::DiffState;
use crate::error::{MemoryError, MemoryResult};
use crate::query::Query;
use crate::table::{Table, Tables};
use crate::writer::{MemoryAttributeWriter, Target};
use featurekit_core::cursor::{
    ChangeNotifier, EmptyCursor, EmptyWriter, FilteringCursor, FilteringWriter, MaxCountCursor, RecordCursor,
    RecordWriter, RowCursor, TypedRecordCursor, TypedRecordWriter,
};
use featurekit_core::lock::CheckedWriter;
use featurekit_core::{
    Config, FeatureLock, Filter, ListenerRegistry, LockManager, Notification, RecordId, RecordType,
    Transaction, Value,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, warn};

/// Writer handed out by [`MemoryStore::writer`]: typed, notifying and lock-checked.
pub type MemoryWriter = CheckedWriter<TypedRecordWriter<MemoryAttributeWriter>>;

/// Type-erased record cursor.
pub type BoxedCursor = Box<dyn RecordCursor + Send>;

/// Type-erased record writer.
pub type BoxedWriter = Box<dyn RecordWriter + Send>;

/// Rows visible to one transaction, with their record type.
type Snapshot = (Arc<RecordType>, Vec<(String, Vec<Value>)>);

/// Feature store keeping every record type in memory.
///
/// Auto-Commit writes apply immediately. Writes under an explicit
/// transaction are held in a per-type [`DiffState`] attached to the
/// transaction and applied when it commits. Cloning shares the store.
///
/// # Example
///
/// ```rust
/// use featurekit_core::{ColumnDescriptor, RecordType, Transaction, Value, ValueKind};
/// use featurekit_memory::MemoryStore;
///
/// let store = MemoryStore::default();
/// store
///     .create_type(RecordType::new("road", vec![ColumnDescriptor::new("name", ValueKind::Text)]))
///     .unwrap();
///
/// let txn = Transaction::new();
/// let ids = store.add_records("road", vec![vec![Value::from("Main St")]], &txn).unwrap();
/// assert_eq!(store.count("road").unwrap(), 0);
///
/// txn.commit().unwrap();
/// assert_eq!(store.count("road").unwrap(), 1);
/// assert!(ids[0].value().starts_with("road."));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    config: Config,
    tables: Tables,
    registry: Arc<ListenerRegistry>,
    locks: LockManager,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            registry: Arc::new(ListenerRegistry::with_config(&config)),
            config,
            tables: Arc::new(RwLock::new(BTreeMap::new())),
            locks: LockManager::new(),
        }
    }

    /// Store configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registry delivering change notifications of this store.
    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    /// Lock table of this store.
    pub fn lock_manager(&self) -> &LockManager {
        &self.locks
    }

    /// Registers a record type.
    ///
    /// # Errors
    ///
    /// `DuplicateType` if the name is taken.
    pub fn create_type(&self, record_type: RecordType) -> MemoryResult<Arc<RecordType>> {
        let mut tables = self.tables.write();
        let name = record_type.name().to_string();
        if tables.contains_key(&name) {
            return Err(MemoryError::DuplicateType(name));
        }
        let record_type = Arc::new(record_type);
        tables.insert(name.clone(), Table::new(Arc::clone(&record_type)));
        debug!(type_name = %name, "record type created");
        Ok(record_type)
    }

    /// The record type called `name`.
    pub fn record_type(&self, name: &str) -> MemoryResult<Arc<RecordType>> {
        self.tables
            .read()
            .get(name)
            .map(|table| Arc::clone(&table.record_type))
            .ok_or_else(|| MemoryError::UnknownType(name.to_string()))
    }

    /// Names of every record type, sorted.
    pub fn type_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Number of committed records of `name`.
    pub fn count(&self, name: &str) -> MemoryResult<usize> {
        self.tables
            .read()
            .get(name)
            .map(|table| table.rows.len())
            .ok_or_else(|| MemoryError::UnknownType(name.to_string()))
    }

    /// Attribute cursor over a snapshot of the committed rows of `name`.
    pub fn attribute_cursor(&self, name: &str) -> MemoryResult<RowCursor> {
        let (record_type, rows) = self.snapshot(name, &Transaction::auto_commit())?;
        Ok(RowCursor::with_ids(record_type.columns().to_vec(), rows))
    }

    /// Typed cursor over the records of `name` as `transaction` sees them.
    pub fn reader(&self, name: &str, transaction: &Transaction) -> MemoryResult<TypedRecordCursor<RowCursor>> {
        let (record_type, rows) = self.snapshot(name, transaction)?;
        let attributes = RowCursor::with_ids(record_type.columns().to_vec(), rows);
        Ok(TypedRecordCursor::with_type(attributes, record_type))
    }

    /// Cursor over the records of `name` selected by `query`.
    pub fn query(&self, name: &str, query: &Query, transaction: &Transaction) -> MemoryResult<BoxedCursor> {
        let reader = self.reader(name, transaction)?;
        let cursor: BoxedCursor = match &query.filter {
            Filter::Include => Box::new(reader),
            Filter::Exclude => Box::new(EmptyCursor::new(Arc::clone(reader.record_type()))),
            filter => Box::new(FilteringCursor::new(reader, filter.clone())?),
        };
        Ok(match query.max_records {
            Some(max) => Box::new(MaxCountCursor::new(cursor, max)),
            None => cursor,
        })
    }

    /// Writer over every record of `name`, appending once they run out.
    pub fn writer(&self, name: &str, transaction: &Transaction) -> MemoryResult<MemoryWriter> {
        self.build_writer(name, transaction, true)
    }

    /// Writer over the records of `name` matching `filter`.
    ///
    /// `Include` yields the full [`writer`](Self::writer) and `Exclude` an
    /// [`EmptyWriter`]. Any other filter never appends.
    pub fn writer_filtered(
        &self,
        name: &str,
        filter: Filter,
        transaction: &Transaction,
    ) -> MemoryResult<BoxedWriter> {
        Ok(match filter {
            Filter::Include => Box::new(self.writer(name, transaction)?),
            Filter::Exclude => Box::new(EmptyWriter::new(self.record_type(name)?)),
            filter => Box::new(FilteringWriter::new(self.writer(name, transaction)?, filter)?),
        })
    }

    /// Writer that only appends new records to `name`.
    pub fn writer_append(&self, name: &str, transaction: &Transaction) -> MemoryResult<MemoryWriter> {
        self.build_writer(name, transaction, false)
    }

    /// Appends one record per row of values.
    ///
    /// Returns the identifier handles of the new records. Under an explicit
    /// transaction they hold temporary values until commit rewrites them.
    pub fn add_records(
        &self,
        name: &str,
        rows: Vec<Vec<Value>>,
        transaction: &Transaction,
    ) -> MemoryResult<Vec<RecordId>> {
        let writer = self.writer_append(name, transaction)?;
        with_writer(writer, |writer| {
            let mut ids = Vec::with_capacity(rows.len());
            for values in rows {
                let record = writer.next()?;
                record.set_values(values)?;
                ids.push(record.id().clone());
                writer.write()?;
            }
            Ok(ids)
        })
    }

    /// Sets `column` to `value` on every record matching `filter`.
    ///
    /// Returns the number of records modified.
    pub fn modify_records(
        &self,
        name: &str,
        filter: Filter,
        column: &str,
        value: Value,
        transaction: &Transaction,
    ) -> MemoryResult<usize> {
        let writer = self.writer_filtered(name, filter, transaction)?;
        with_writer(writer, |writer| {
            let mut modified = 0;
            while writer.has_next()? {
                writer.next()?.set_by_name(column, value.clone())?;
                writer.write()?;
                modified += 1;
            }
            Ok(modified)
        })
    }

    /// Removes every record matching `filter`.
    ///
    /// Returns the number of records removed.
    pub fn remove_records(&self, name: &str, filter: Filter, transaction: &Transaction) -> MemoryResult<usize> {
        let writer = self.writer_filtered(name, filter, transaction)?;
        with_writer(writer, |writer| {
            let mut removed = 0;
            while writer.has_next()? {
                writer.next()?;
                writer.remove()?;
                removed += 1;
            }
            Ok(removed)
        })
    }

    /// A lock lasting the configured default duration.
    pub fn generate_lock(&self, name: &str) -> FeatureLock {
        FeatureLock::generate(name, self.config.default_lock_duration)
    }

    /// Locks every record of `name` matching `filter`.
    ///
    /// Returns the number of records locked.
    pub fn lock_records(
        &self,
        name: &str,
        filter: Filter,
        lock: &FeatureLock,
        transaction: &Transaction,
    ) -> MemoryResult<usize> {
        let ids = self.matching_ids(name, filter, transaction)?;
        for id in &ids {
            self.locks.lock_record(name, id, transaction, lock)?;
        }
        Ok(ids.len())
    }

    /// Unlocks every record of `name` matching `filter`.
    ///
    /// Returns the number of records visited.
    pub fn unlock_records(
        &self,
        name: &str,
        filter: Filter,
        lock: &FeatureLock,
        transaction: &Transaction,
    ) -> MemoryResult<usize> {
        let ids = self.matching_ids(name, filter, transaction)?;
        for id in &ids {
            self.locks.unlock_record(name, id, transaction, lock)?;
        }
        Ok(ids.len())
    }

    /// Subscribes to changes of `name` as seen from `transaction`.
    pub fn subscribe(&self, name: &str, transaction: &Transaction) -> Receiver<Notification> {
        self.registry.subscribe(name, transaction)
    }

    fn matching_ids(&self, name: &str, filter: Filter, transaction: &Transaction) -> MemoryResult<Vec<String>> {
        let cursor = self.query(name, &Query::filtered(filter), transaction)?;
        let mut ids = Vec::new();
        for record in cursor.into_records() {
            ids.push(record?.id().value());
        }
        Ok(ids)
    }

    fn snapshot(&self, name: &str, transaction: &Transaction) -> MemoryResult<Snapshot> {
        let diff = match transaction {
            Transaction::AutoCommit => None,
            Transaction::Explicit(_) => transaction.get_state_as::<DiffState>(&DiffState::key(name))?,
        };
        let tables = self.tables.read();
        let table = tables
            .get(name)
            .ok_or_else(|| MemoryError::UnknownType(name.to_string()))?;
        let rows = match &diff {
            Some(state) => state.with_diff(|d| table.visible_rows(Some(d))),
            None => table.visible_rows(None),
        };
        Ok((Arc::clone(&table.record_type), rows))
    }

    fn diff_state(&self, name: &str, transaction: &Transaction) -> MemoryResult<Arc<DiffState>> {
        let key = DiffState::key(name);
        if let Some(state) = transaction.get_state_as::<DiffState>(&key)? {
            return Ok(state);
        }
        let state = Arc::new(DiffState::new(
            name,
            Arc::clone(&self.tables),
            Arc::clone(&self.registry),
        ));
        transaction.put_state(&key, state.clone())?;
        Ok(state)
    }

    fn build_writer(&self, name: &str, transaction: &Transaction, existing: bool) -> MemoryResult<MemoryWriter> {
        let (record_type, rows) = if existing {
            self.snapshot(name, transaction)?
        } else {
            (self.record_type(name)?, Vec::new())
        };
        let target = if transaction.is_auto_commit() {
            Target::Direct(Arc::clone(&self.tables))
        } else {
            Target::Diff(self.diff_state(name, transaction)?)
        };
        let attributes = MemoryAttributeWriter::new(name, record_type.columns().to_vec(), rows, target);
        let notifier = ChangeNotifier::new(name, transaction.clone(), Arc::clone(&self.registry));
        let typed = TypedRecordWriter::new(attributes, record_type)
            .with_config(&self.config)
            .with_notifier(notifier);
        Ok(self.locks.checked_writer(typed, transaction))
    }
}

/// Runs `f` against `writer`, then closes it whatever `f` returned.
///
/// The error from `f` wins over a close error.
fn with_writer<W, T>(mut writer: W, f: impl FnOnce(&mut W) -> MemoryResult<T>) -> MemoryResult<T>
where
    W: RecordWriter,
{
    let result = f(&mut writer);
    let closed = writer.close();
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close)) => {
            warn!(error = %close, "writer close failed after an earlier error");
            Err(e)
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
