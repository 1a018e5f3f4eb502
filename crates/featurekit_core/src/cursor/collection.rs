//! Record cursors over already materialized records, and the empty writer.

use super::{RecordCursor, RecordWriter};
use crate::error::{CoreError, CoreResult};
use crate::record::Record;
use crate::schema::RecordType;
use std::sync::Arc;
use std::vec;

/// A [`RecordCursor`] over a vector of records.
#[derive(Debug)]
pub struct CollectionCursor {
    record_type: Arc<RecordType>,
    records: vec::IntoIter<Record>,
    closed: bool,
}

impl CollectionCursor {
    /// Creates a cursor yielding `records` in order.
    #[must_use]
    pub fn new(record_type: Arc<RecordType>, records: Vec<Record>) -> Self {
        Self {
            record_type,
            records: records.into_iter(),
            closed: false,
        }
    }
}

impl RecordCursor for CollectionCursor {
    fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        if self.closed {
            return Err(CoreError::closed("collection cursor"));
        }
        Ok(self.records.len() > 0)
    }

    fn next(&mut self) -> CoreResult<Record> {
        if self.closed {
            return Err(CoreError::closed("collection cursor"));
        }
        self.records
            .next()
            .ok_or_else(|| CoreError::no_such_element("collection cursor is exhausted"))
    }

    fn close(&mut self) -> CoreResult<()> {
        self.closed = true;
        self.records = Vec::new().into_iter();
        Ok(())
    }
}

/// A [`RecordCursor`] that never yields anything.
#[derive(Debug)]
pub struct EmptyCursor {
    record_type: Arc<RecordType>,
}

impl EmptyCursor {
    /// Creates an empty cursor of the given type.
    #[must_use]
    pub fn new(record_type: Arc<RecordType>) -> Self {
        Self { record_type }
    }
}

impl RecordCursor for EmptyCursor {
    fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        Ok(false)
    }

    fn next(&mut self) -> CoreResult<Record> {
        Err(CoreError::no_such_element("empty cursor"))
    }

    fn close(&mut self) -> CoreResult<()> {
        Ok(())
    }
}

/// A [`RecordWriter`] with nothing to visit that never appends.
#[derive(Debug)]
pub struct EmptyWriter {
    record_type: Arc<RecordType>,
}

impl EmptyWriter {
    /// Creates an empty writer of the given type.
    #[must_use]
    pub fn new(record_type: Arc<RecordType>) -> Self {
        Self { record_type }
    }
}

impl RecordWriter for EmptyWriter {
    fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        Ok(false)
    }

    fn next(&mut self) -> CoreResult<&mut Record> {
        Err(CoreError::no_such_element("empty writer"))
    }

    fn current_mut(&mut self) -> Option<&mut Record> {
        None
    }

    fn write(&mut self) -> CoreResult<()> {
        Err(CoreError::illegal_state("no feature available"))
    }

    fn remove(&mut self) -> CoreResult<()> {
        Err(CoreError::illegal_state("no feature available"))
    }

    fn close(&mut self) -> CoreResult<()> {
        Ok(())
    }
}
