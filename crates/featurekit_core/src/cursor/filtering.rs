//! Predicate decorators for record cursors and writers.

use super::{Delegating, RecordCursor, RecordWriter};
use crate::error::{CoreError, CoreResult};
use crate::filter::Filter;
use crate::record::Record;
use crate::schema::RecordType;
use std::sync::Arc;
use tracing::trace;

fn check_filter(filter: &Filter) -> CoreResult<()> {
    if filter.is_include() || filter.is_exclude() {
        return Err(CoreError::invalid_argument(
            "filtering needs a real predicate, not Include or Exclude",
        ));
    }
    Ok(())
}

/// Yields only the records of the wrapped cursor that satisfy a filter.
///
/// `has_next()` looks ahead and caches the next match, so repeated calls
/// never skip records. Order is preserved.
#[derive(Debug)]
pub struct FilteringCursor<C> {
    inner: C,
    filter: Filter,
    next: Option<Record>,
}

impl<C: RecordCursor> FilteringCursor<C> {
    /// Wraps `inner`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for `Filter::Include` and `Filter::Exclude`; callers
    /// skip the decorator or use an empty cursor instead.
    pub fn new(inner: C, filter: Filter) -> CoreResult<Self> {
        check_filter(&filter)?;
        Ok(Self {
            inner,
            filter,
            next: None,
        })
    }

    /// The filter applied.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }
}

impl<C: RecordCursor> RecordCursor for FilteringCursor<C> {
    fn record_type(&self) -> &Arc<RecordType> {
        self.inner.record_type()
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        if self.next.is_some() {
            return Ok(true);
        }
        while self.inner.has_next()? {
            let record = self.inner.next()?;
            if self.filter.evaluate(&record) {
                trace!(id = %record.id(), "filter matched");
                self.next = Some(record);
                return Ok(true);
            }
            trace!(id = %record.id(), "filter skipped");
        }
        Ok(false)
    }

    fn next(&mut self) -> CoreResult<Record> {
        if !self.has_next()? {
            return Err(CoreError::no_such_element("no more matching features"));
        }
        self.next
            .take()
            .ok_or_else(|| CoreError::no_such_element("no more matching features"))
    }

    fn close(&mut self) -> CoreResult<()> {
        self.next = None;
        self.inner.close()
    }
}

impl<C> Delegating for FilteringCursor<C> {
    type Inner = C;

    fn delegate(&self) -> &C {
        &self.inner
    }

    fn delegate_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}

/// Restricts a writer to the existing records that satisfy a filter.
///
/// Never appends: once the wrapped writer runs out of existing rows,
/// `has_next()` is false and `next()` fails.
#[derive(Debug)]
pub struct FilteringWriter<W> {
    inner: W,
    filter: Filter,
    /// A match is positioned in the inner writer but not handed out yet.
    lookahead: bool,
    /// The match was handed out and awaits `write()` or `remove()`.
    current: bool,
    closed: bool,
}

impl<W: RecordWriter> FilteringWriter<W> {
    /// Wraps `inner`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for `Filter::Include` and `Filter::Exclude`.
    pub fn new(inner: W, filter: Filter) -> CoreResult<Self> {
        check_filter(&filter)?;
        Ok(Self {
            inner,
            filter,
            lookahead: false,
            current: false,
            closed: false,
        })
    }
}

impl<W: RecordWriter> RecordWriter for FilteringWriter<W> {
    fn record_type(&self) -> &Arc<RecordType> {
        self.inner.record_type()
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        if self.closed {
            return Ok(false);
        }
        if self.lookahead {
            return Ok(true);
        }
        self.current = false;
        while self.inner.has_next()? {
            let record = self.inner.next()?;
            if self.filter.evaluate(record) {
                trace!(id = %record.id(), "filter matched");
                self.lookahead = true;
                return Ok(true);
            }
            trace!(id = %record.id(), "filter skipped");
        }
        Ok(false)
    }

    fn next(&mut self) -> CoreResult<&mut Record> {
        if !self.has_next()? {
            return Err(CoreError::no_such_element("no more matching features"));
        }
        self.lookahead = false;
        self.current = true;
        self.inner
            .current_mut()
            .ok_or_else(|| CoreError::illegal_state("wrapped writer lost its current feature"))
    }

    fn current_mut(&mut self) -> Option<&mut Record> {
        if self.current {
            self.inner.current_mut()
        } else {
            None
        }
    }

    fn write(&mut self) -> CoreResult<()> {
        if !self.current {
            return Err(CoreError::illegal_state("no feature available"));
        }
        self.current = false;
        self.inner.write()
    }

    fn remove(&mut self) -> CoreResult<()> {
        if !self.current {
            return Err(CoreError::illegal_state("no feature available"));
        }
        self.current = false;
        self.inner.remove()
    }

    fn close(&mut self) -> CoreResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.lookahead = false;
        self.current = false;
        self.inner.close()
    }
}

impl<W> Delegating for FilteringWriter<W> {
    type Inner = W;

    fn delegate(&self) -> &W {
        &self.inner
    }

    fn delegate_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}
