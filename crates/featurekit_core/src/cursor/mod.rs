//! Cursor contracts and decorators.
//!
//! Reading goes through two layers:
//! - [`AttributeCursor`]: row-at-a-time access to a fixed, ordered set of
//!   columns, addressed by position
//! - [`RecordCursor`]: whole records bound to a [`RecordType`], one per call
//!   to `next()`
//!
//! Writing mirrors this with [`AttributeWriter`] and [`RecordWriter`].
//! Decorators wrap one of these traits and implement the same trait, so
//! chains are built by plain construction:
//!
//! ```rust
//! use featurekit_core::cursor::{FilteringCursor, MaxCountCursor, RecordCursor, RowCursor, TypedRecordCursor};
//! use featurekit_core::{ColumnDescriptor, Filter, Value, ValueKind};
//!
//! let rows = RowCursor::new(
//!     vec![ColumnDescriptor::new("n", ValueKind::Integer)],
//!     (0..10).map(|n| vec![Value::Integer(n)]).collect(),
//! );
//! let typed = TypedRecordCursor::new(rows);
//! let even = Filter::matching("even", |r| r.get(0).ok().and_then(Value::as_i64).map_or(false, |n| n % 2 == 0));
//! let mut cursor = MaxCountCursor::new(FilteringCursor::new(typed, even).unwrap(), 3);
//!
//! let mut seen = Vec::new();
//! while cursor.has_next().unwrap() {
//!     seen.push(cursor.next().unwrap().get(0).unwrap().as_i64().unwrap());
//! }
//! cursor.close().unwrap();
//! assert_eq!(seen, vec![0, 2, 4]);
//! ```
//!
//! Cursors are single-caller objects. The only cross-thread hook is
//! [`CloseSignal`], which lets another thread cancel a cursor.

mod collection;
mod delegate;
mod filtering;
mod joining;
mod max;
mod rows;
mod typed;

pub use collection::{CollectionCursor, EmptyCursor, EmptyWriter};
pub use delegate::Delegating;
pub use filtering::{FilteringCursor, FilteringWriter};
pub use joining::{JoiningCursor, JoiningWriter};
pub use max::MaxCountCursor;
pub use rows::RowCursor;
pub use typed::{ChangeNotifier, TypedRecordCursor, TypedRecordWriter};

use crate::error::{CoreError, CoreResult};
use crate::record::{Record, RecordId};
use crate::schema::{ColumnDescriptor, RecordType};
use crate::value::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Row-oriented iteration over a fixed, ordered set of columns.
///
/// # Protocol
///
/// `advance()` must be called before the first `read()`. Once `close()` has
/// been called, every method except `column_count` and `column_at` fails
/// with [`CoreError::Closed`].
pub trait AttributeCursor {
    /// Number of columns.
    fn column_count(&self) -> usize;

    /// Descriptor of the column at `index`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when `index >= column_count()`.
    fn column_at(&self, index: usize) -> CoreResult<&ColumnDescriptor>;

    /// Returns true if another row is available.
    fn has_next(&mut self) -> CoreResult<bool>;

    /// Positions the cursor on the next row.
    fn advance(&mut self) -> CoreResult<()>;

    /// Reads the value at `index` of the current row.
    fn read(&mut self, index: usize) -> CoreResult<Value>;

    /// Identifier of the current row, when the backend stores one.
    fn read_id(&mut self) -> CoreResult<Option<String>> {
        Ok(None)
    }

    /// Releases backing resources. Idempotent.
    fn close(&mut self) -> CoreResult<()>;
}

/// Row-oriented mutation over a fixed, ordered set of columns.
///
/// `advance()` moves to the next existing row and, once those are
/// exhausted, to a fresh appended row. Values written with `write()` are
/// held for the current row until `write_row()` persists them.
pub trait AttributeWriter {
    /// Number of columns.
    fn column_count(&self) -> usize;

    /// Descriptor of the column at `index`.
    fn column_at(&self, index: usize) -> CoreResult<&ColumnDescriptor>;

    /// Returns true if another existing row is available.
    fn has_next(&mut self) -> CoreResult<bool>;

    /// Moves to the next existing row, or appends a fresh one.
    fn advance(&mut self) -> CoreResult<()>;

    /// Reads the value at `index` of the current row.
    fn read(&mut self, index: usize) -> CoreResult<Value>;

    /// Identifier of the current row, when the backend stores one.
    fn read_id(&mut self) -> CoreResult<Option<String>> {
        Ok(None)
    }

    /// Sets the value at `index` of the current row.
    fn write(&mut self, index: usize, value: Value) -> CoreResult<()>;

    /// Persists the current row under `id`.
    fn write_row(&mut self, id: &RecordId) -> CoreResult<()>;

    /// Deletes the current row.
    fn remove_row(&mut self) -> CoreResult<()>;

    /// Releases backing resources. Idempotent.
    fn close(&mut self) -> CoreResult<()>;
}

/// Iteration over whole records.
pub trait RecordCursor {
    /// Type of the records produced.
    fn record_type(&self) -> &Arc<RecordType>;

    /// Returns true if another record is available.
    fn has_next(&mut self) -> CoreResult<bool>;

    /// Returns the next record.
    ///
    /// # Errors
    ///
    /// `NoSuchElement` when exhausted; on any error the cursor position is
    /// unspecified and the caller should close it.
    fn next(&mut self) -> CoreResult<Record>;

    /// Releases the cursor and everything it wraps. Idempotent.
    fn close(&mut self) -> CoreResult<()>;

    /// Adapts the cursor into an iterator that closes it when done.
    fn into_records(self) -> Records<Self>
    where
        Self: Sized,
    {
        Records {
            cursor: self,
            done: false,
        }
    }
}

/// Mutation over whole records.
///
/// The protocol has three steps: `next()` positions on a record (an existing
/// one, or a blank appended one once existing records run out), the caller
/// edits it in place, then `write()` persists it or `remove()` deletes it.
pub trait RecordWriter {
    /// Type of the records written.
    fn record_type(&self) -> &Arc<RecordType>;

    /// Returns true if another existing record is available.
    fn has_next(&mut self) -> CoreResult<bool>;

    /// Positions on the next record and returns it for editing.
    fn next(&mut self) -> CoreResult<&mut Record>;

    /// The record returned by the last `next()`, until written or removed.
    fn current_mut(&mut self) -> Option<&mut Record>;

    /// Persists the current record.
    fn write(&mut self) -> CoreResult<()>;

    /// Deletes the current record.
    fn remove(&mut self) -> CoreResult<()>;

    /// Releases the writer and everything it wraps. Idempotent.
    fn close(&mut self) -> CoreResult<()>;
}

impl<T: AttributeCursor + ?Sized> AttributeCursor for Box<T> {
    fn column_count(&self) -> usize {
        (**self).column_count()
    }
    fn column_at(&self, index: usize) -> CoreResult<&ColumnDescriptor> {
        (**self).column_at(index)
    }
    fn has_next(&mut self) -> CoreResult<bool> {
        (**self).has_next()
    }
    fn advance(&mut self) -> CoreResult<()> {
        (**self).advance()
    }
    fn read(&mut self, index: usize) -> CoreResult<Value> {
        (**self).read(index)
    }
    fn read_id(&mut self) -> CoreResult<Option<String>> {
        (**self).read_id()
    }
    fn close(&mut self) -> CoreResult<()> {
        (**self).close()
    }
}

impl<T: AttributeWriter + ?Sized> AttributeWriter for Box<T> {
    fn column_count(&self) -> usize {
        (**self).column_count()
    }
    fn column_at(&self, index: usize) -> CoreResult<&ColumnDescriptor> {
        (**self).column_at(index)
    }
    fn has_next(&mut self) -> CoreResult<bool> {
        (**self).has_next()
    }
    fn advance(&mut self) -> CoreResult<()> {
        (**self).advance()
    }
    fn read(&mut self, index: usize) -> CoreResult<Value> {
        (**self).read(index)
    }
    fn read_id(&mut self) -> CoreResult<Option<String>> {
        (**self).read_id()
    }
    fn write(&mut self, index: usize, value: Value) -> CoreResult<()> {
        (**self).write(index, value)
    }
    fn write_row(&mut self, id: &RecordId) -> CoreResult<()> {
        (**self).write_row(id)
    }
    fn remove_row(&mut self) -> CoreResult<()> {
        (**self).remove_row()
    }
    fn close(&mut self) -> CoreResult<()> {
        (**self).close()
    }
}

impl<T: RecordCursor + ?Sized> RecordCursor for Box<T> {
    fn record_type(&self) -> &Arc<RecordType> {
        (**self).record_type()
    }
    fn has_next(&mut self) -> CoreResult<bool> {
        (**self).has_next()
    }
    fn next(&mut self) -> CoreResult<Record> {
        (**self).next()
    }
    fn close(&mut self) -> CoreResult<()> {
        (**self).close()
    }
}

impl<T: RecordWriter + ?Sized> RecordWriter for Box<T> {
    fn record_type(&self) -> &Arc<RecordType> {
        (**self).record_type()
    }
    fn has_next(&mut self) -> CoreResult<bool> {
        (**self).has_next()
    }
    fn next(&mut self) -> CoreResult<&mut Record> {
        (**self).next()
    }
    fn current_mut(&mut self) -> Option<&mut Record> {
        (**self).current_mut()
    }
    fn write(&mut self) -> CoreResult<()> {
        (**self).write()
    }
    fn remove(&mut self) -> CoreResult<()> {
        (**self).remove()
    }
    fn close(&mut self) -> CoreResult<()> {
        (**self).close()
    }
}

/// Iterator over a [`RecordCursor`], closing it on exhaustion, on the first
/// error and on drop.
pub struct Records<C: RecordCursor> {
    cursor: C,
    done: bool,
}

impl<C: RecordCursor> Records<C> {
    fn finish(&mut self) -> CoreResult<()> {
        self.done = true;
        self.cursor.close()
    }
}

impl<C: RecordCursor> Iterator for Records<C> {
    type Item = CoreResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.has_next() {
            Ok(true) => match self.cursor.next() {
                Ok(record) => Some(Ok(record)),
                Err(e) => {
                    let _ = self.finish();
                    Some(Err(e))
                }
            },
            Ok(false) => self.finish().err().map(Err),
            Err(e) => {
                let _ = self.finish();
                Some(Err(e))
            }
        }
    }
}

impl<C: RecordCursor> Drop for Records<C> {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.cursor.close();
        }
    }
}

/// Cancellation flag shared between a cursor and other threads.
///
/// Raising the signal closes the cursor: every later call on it fails with
/// [`CoreError::Closed`] instead of blocking.
#[derive(Debug, Clone, Default)]
pub struct CloseSignal(Arc<AtomicBool>);

impl CloseSignal {
    /// Creates a signal in the open state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the owning cursor as closed.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once raised.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fails with `Closed` once raised.
    pub fn check(&self, resource: &'static str) -> CoreResult<()> {
        if self.is_raised() {
            Err(CoreError::closed(resource))
        } else {
            Ok(())
        }
    }
}
