//! Limits the number of records a cursor yields.

use super::{Delegating, RecordCursor};
use crate::error::{CoreError, CoreResult};
use crate::record::Record;
use crate::schema::RecordType;
use std::sync::Arc;

/// Yields at most `max` records of the wrapped cursor.
#[derive(Debug)]
pub struct MaxCountCursor<C> {
    inner: C,
    max: usize,
    count: usize,
}

impl<C: RecordCursor> MaxCountCursor<C> {
    /// Wraps `inner`, stopping after `max` records.
    pub fn new(inner: C, max: usize) -> Self {
        Self {
            inner,
            max,
            count: 0,
        }
    }

    /// Number of records returned so far.
    pub fn returned(&self) -> usize {
        self.count
    }
}

impl<C: RecordCursor> RecordCursor for MaxCountCursor<C> {
    fn record_type(&self) -> &Arc<RecordType> {
        self.inner.record_type()
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        if self.count >= self.max {
            return Ok(false);
        }
        self.inner.has_next()
    }

    fn next(&mut self) -> CoreResult<Record> {
        if self.count >= self.max {
            return Err(CoreError::no_such_element(format!(
                "maximum of {} features reached",
                self.max
            )));
        }
        let record = self.inner.next()?;
        self.count += 1;
        Ok(record)
    }

    fn close(&mut self) -> CoreResult<()> {
        self.inner.close()
    }
}

impl<C> Delegating for MaxCountCursor<C> {
    type Inner = C;

    fn delegate(&self) -> &C {
        &self.inner
    }

    fn delegate_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}
