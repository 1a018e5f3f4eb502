//! Typed record layer over attribute cursors and writers.

use super::{AttributeCursor, AttributeWriter, Delegating, RecordCursor, RecordWriter};
use crate::config::Config;
use crate::envelope::Envelope;
use crate::error::{CoreError, CoreResult};
use crate::event::{ChangeEvent, ChangeType, ListenerRegistry};
use crate::filter::Filter;
use crate::record::{Record, RecordId};
use crate::schema::{ColumnDescriptor, RecordType};
use crate::transaction::Transaction;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide counter for temporary identifiers of appended records.
static NEXT_TEMP_ID: AtomicU64 = AtomicU64::new(0);

fn derive_type(columns: impl Iterator<Item = ColumnDescriptor>) -> Arc<RecordType> {
    RecordType::shared(RecordType::ANONYMOUS, columns.collect())
}

/// Binds the rows of an [`AttributeCursor`] to a [`RecordType`].
#[derive(Debug)]
pub struct TypedRecordCursor<C> {
    inner: C,
    record_type: Arc<RecordType>,
    counter: u64,
}

impl<C: AttributeCursor> TypedRecordCursor<C> {
    /// Wraps `inner`, deriving an anonymous record type from its columns.
    pub fn new(inner: C) -> Self {
        let record_type = derive_type(
            (0..inner.column_count()).filter_map(|i| inner.column_at(i).ok().cloned()),
        );
        Self::with_type(inner, record_type)
    }

    /// Wraps `inner`, binding every row to `record_type`.
    pub fn with_type(inner: C, record_type: Arc<RecordType>) -> Self {
        Self {
            inner,
            record_type,
            counter: 0,
        }
    }

    fn next_id(&mut self, backend: Option<String>) -> RecordId {
        self.counter += 1;
        match backend {
            Some(id) => RecordId::new(id),
            None => RecordId::new(format!("{}.{}", self.record_type.name(), self.counter)),
        }
    }
}

impl<C: AttributeCursor> RecordCursor for TypedRecordCursor<C> {
    fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        self.inner.has_next()
    }

    fn next(&mut self) -> CoreResult<Record> {
        self.inner.advance()?;
        let count = self.inner.column_count();
        let values = (0..count)
            .map(|i| self.inner.read(i))
            .collect::<CoreResult<Vec<_>>>()?;
        let backend = self.inner.read_id()?;
        let id = self.next_id(backend);
        Record::new(self.record_type.clone(), id, values)
    }

    fn close(&mut self) -> CoreResult<()> {
        self.inner.close()
    }
}

impl<C> Delegating for TypedRecordCursor<C> {
    type Inner = C;

    fn delegate(&self) -> &C {
        &self.inner
    }

    fn delegate_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}

/// Routes the change events of a writer to a [`ListenerRegistry`].
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    type_name: String,
    transaction: Transaction,
    registry: Arc<ListenerRegistry>,
}

impl ChangeNotifier {
    /// Creates a notifier for `type_name` changes made under `transaction`.
    pub fn new(
        type_name: impl Into<String>,
        transaction: Transaction,
        registry: Arc<ListenerRegistry>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            transaction,
            registry,
        }
    }

    /// Delivers one change of `record`.
    pub fn emit(&self, change_type: ChangeType, record: &Record, bounds: Envelope) {
        self.registry.notify(ChangeEvent::new(
            self.type_name.clone(),
            self.transaction.id(),
            change_type,
            bounds,
            Filter::id_handles([record.id().clone()]),
        ));
    }
}

#[derive(Debug)]
struct Current {
    record: Record,
    appended: bool,
    original_bounds: Envelope,
}

/// Three-state mutating cursor over an [`AttributeWriter`].
///
/// `next()` positions on an existing row for update, or appends a blank
/// record with a temporary identifier once existing rows run out. The caller
/// edits the returned record, then `write()` or `remove()` applies it.
#[derive(Debug)]
pub struct TypedRecordWriter<W> {
    inner: W,
    record_type: Arc<RecordType>,
    current: Option<Current>,
    notifier: Option<ChangeNotifier>,
    temp_id_prefix: String,
    counter: u64,
    closed: bool,
}

impl<W: AttributeWriter> TypedRecordWriter<W> {
    /// Wraps `inner`, binding rows to `record_type`.
    pub fn new(inner: W, record_type: Arc<RecordType>) -> Self {
        Self {
            inner,
            record_type,
            current: None,
            notifier: None,
            temp_id_prefix: Config::default().temp_id_prefix,
            counter: 0,
            closed: false,
        }
    }

    /// Sends one event per persisted write or remove through `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Applies writer settings from `config`.
    #[must_use]
    pub fn with_config(mut self, config: &Config) -> Self {
        self.temp_id_prefix = config.temp_id_prefix.clone();
        self
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.closed {
            Err(CoreError::closed("record writer"))
        } else {
            Ok(())
        }
    }

    fn take_current(&mut self) -> CoreResult<Current> {
        self.current
            .take()
            .ok_or_else(|| CoreError::illegal_state("no feature available"))
    }

    fn emit(&self, change_type: ChangeType, record: &Record, bounds: Envelope) {
        if let Some(notifier) = &self.notifier {
            notifier.emit(change_type, record, bounds);
        }
    }
}

impl<W: AttributeWriter> RecordWriter for TypedRecordWriter<W> {
    fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        self.ensure_open()?;
        self.inner.has_next()
    }

    fn next(&mut self) -> CoreResult<&mut Record> {
        self.ensure_open()?;
        let existing = self.inner.has_next()?;
        self.inner.advance()?;
        let current = if existing {
            let count = self.inner.column_count();
            let values = (0..count)
                .map(|i| self.inner.read(i))
                .collect::<CoreResult<Vec<_>>>()?;
            self.counter += 1;
            let id = match self.inner.read_id()? {
                Some(id) => RecordId::new(id),
                None => RecordId::new(format!("{}.{}", self.record_type.name(), self.counter)),
            };
            let record = Record::new(self.record_type.clone(), id, values)?;
            let original_bounds = record.bounds();
            Current {
                record,
                appended: false,
                original_bounds,
            }
        } else {
            let n = NEXT_TEMP_ID.fetch_add(1, Ordering::SeqCst);
            let id = RecordId::new(format!("{}{n}", self.temp_id_prefix));
            Current {
                record: Record::blank(self.record_type.clone(), id),
                appended: true,
                original_bounds: Envelope::null(),
            }
        };
        Ok(&mut self.current.insert(current).record)
    }

    fn current_mut(&mut self) -> Option<&mut Record> {
        self.current.as_mut().map(|c| &mut c.record)
    }

    fn write(&mut self) -> CoreResult<()> {
        self.ensure_open()?;
        match &self.current {
            Some(current) => current.record.validate()?,
            None => return Err(CoreError::illegal_state("no feature available")),
        }
        let current = self.take_current()?;
        for (i, value) in current.record.values().iter().enumerate() {
            self.inner.write(i, value.clone())?;
        }
        self.inner.write_row(current.record.id())?;
        if current.appended {
            self.emit(ChangeType::Added, &current.record, current.record.bounds());
        } else {
            let bounds = current.original_bounds.union(&current.record.bounds());
            self.emit(ChangeType::Modified, &current.record, bounds);
        }
        Ok(())
    }

    fn remove(&mut self) -> CoreResult<()> {
        self.ensure_open()?;
        let current = self.take_current()?;
        if current.appended {
            return Ok(());
        }
        self.inner.remove_row()?;
        self.emit(ChangeType::Removed, &current.record, current.original_bounds);
        Ok(())
    }

    fn close(&mut self) -> CoreResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.current = None;
        self.inner.close()
    }
}

impl<W> Delegating for TypedRecordWriter<W> {
    type Inner = W;

    fn delegate(&self) -> &W {
        &self.inner
    }

    fn delegate_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}
