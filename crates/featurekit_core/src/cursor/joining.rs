//! Side-by-side joins of attribute cursors and writers.
//!
//! The joined column space is the ordered concatenation of the constituents'
//! columns. Position `p` belongs to the constituent with the highest offset
//! not greater than `p`.

use super::{AttributeCursor, AttributeWriter};
use crate::error::{CoreError, CoreResult};
use crate::record::RecordId;
use crate::schema::ColumnDescriptor;
use crate::value::Value;
use tracing::warn;

/// Cumulative column offsets of the constituents and the total column count.
fn offsets(counts: impl Iterator<Item = usize>) -> (Vec<usize>, usize) {
    let mut total = 0;
    let offsets = counts
        .map(|count| {
            let offset = total;
            total += count;
            offset
        })
        .collect();
    (offsets, total)
}

/// Resolves a joined position to (constituent, local position).
fn locate(offsets: &[usize], total: usize, position: usize) -> CoreResult<(usize, usize)> {
    if position < total {
        for (i, offset) in offsets.iter().enumerate().rev() {
            if position >= *offset {
                return Ok((i, position - offset));
            }
        }
    }
    Err(CoreError::out_of_range(position, total))
}

/// Consumes close results, returning the first error and logging the rest.
fn first_error(results: impl Iterator<Item = CoreResult<()>>) -> CoreResult<()> {
    let mut first = None;
    for result in results {
        if let Err(e) = result {
            if first.is_none() {
                first = Some(e);
            } else {
                warn!(error = %e, "additional error while closing joined cursor");
            }
        }
    }
    first.map_or(Ok(()), Err)
}

/// Presents several attribute cursors as one with concatenated columns.
pub struct JoiningCursor {
    cursors: Vec<Box<dyn AttributeCursor + Send>>,
    offsets: Vec<usize>,
    column_count: usize,
}

impl JoiningCursor {
    /// Joins `cursors` in order.
    pub fn new(cursors: Vec<Box<dyn AttributeCursor + Send>>) -> Self {
        let (offsets, column_count) = offsets(cursors.iter().map(|c| c.column_count()));
        Self {
            cursors,
            offsets,
            column_count,
        }
    }

    /// The joined cursors, in column order.
    pub fn constituents(&self) -> &[Box<dyn AttributeCursor + Send>] {
        &self.cursors
    }
}

impl std::fmt::Debug for JoiningCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoiningCursor")
            .field("constituents", &self.cursors.len())
            .field("offsets", &self.offsets)
            .finish()
    }
}

impl AttributeCursor for JoiningCursor {
    fn column_count(&self) -> usize {
        self.column_count
    }

    fn column_at(&self, index: usize) -> CoreResult<&ColumnDescriptor> {
        let (owner, local) = locate(&self.offsets, self.column_count, index)?;
        self.cursors[owner].column_at(local)
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        for cursor in &mut self.cursors {
            if cursor.has_next()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn advance(&mut self) -> CoreResult<()> {
        let mut moved = false;
        for cursor in &mut self.cursors {
            if cursor.has_next()? {
                cursor.advance()?;
                moved = true;
            }
        }
        if moved {
            Ok(())
        } else {
            Err(CoreError::no_such_element("joined cursors are exhausted"))
        }
    }

    fn read(&mut self, index: usize) -> CoreResult<Value> {
        let (owner, local) = locate(&self.offsets, self.column_count, index)?;
        self.cursors[owner].read(local)
    }

    fn read_id(&mut self) -> CoreResult<Option<String>> {
        match self.cursors.first_mut() {
            Some(first) => first.read_id(),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> CoreResult<()> {
        first_error(self.cursors.iter_mut().map(|c| c.close()))
    }
}

/// Presents several attribute writers as one with concatenated columns.
///
/// Every constituent is advanced together so appends stay aligned.
pub struct JoiningWriter {
    writers: Vec<Box<dyn AttributeWriter + Send>>,
    offsets: Vec<usize>,
    column_count: usize,
}

impl JoiningWriter {
    /// Joins `writers` in order.
    pub fn new(writers: Vec<Box<dyn AttributeWriter + Send>>) -> Self {
        let (offsets, column_count) = offsets(writers.iter().map(|w| w.column_count()));
        Self {
            writers,
            offsets,
            column_count,
        }
    }

    /// The joined writers, in column order.
    pub fn constituents(&self) -> &[Box<dyn AttributeWriter + Send>] {
        &self.writers
    }
}

impl std::fmt::Debug for JoiningWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoiningWriter")
            .field("constituents", &self.writers.len())
            .field("offsets", &self.offsets)
            .finish()
    }
}

impl AttributeWriter for JoiningWriter {
    fn column_count(&self) -> usize {
        self.column_count
    }

    fn column_at(&self, index: usize) -> CoreResult<&ColumnDescriptor> {
        let (owner, local) = locate(&self.offsets, self.column_count, index)?;
        self.writers[owner].column_at(local)
    }

    fn has_next(&mut self) -> CoreResult<bool> {
        for writer in &mut self.writers {
            if writer.has_next()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn advance(&mut self) -> CoreResult<()> {
        for writer in &mut self.writers {
            writer.advance()?;
        }
        Ok(())
    }

    fn read(&mut self, index: usize) -> CoreResult<Value> {
        let (owner, local) = locate(&self.offsets, self.column_count, index)?;
        self.writers[owner].read(local)
    }

    fn read_id(&mut self) -> CoreResult<Option<String>> {
        match self.writers.first_mut() {
            Some(first) => first.read_id(),
            None => Ok(None),
        }
    }

    fn write(&mut self, index: usize, value: Value) -> CoreResult<()> {
        let (owner, local) = locate(&self.offsets, self.column_count, index)?;
        self.writers[owner].write(local, value)
    }

    fn write_row(&mut self, id: &RecordId) -> CoreResult<()> {
        for writer in &mut self.writers {
            writer.write_row(id)?;
        }
        Ok(())
    }

    fn remove_row(&mut self) -> CoreResult<()> {
        for writer in &mut self.writers {
            writer.remove_row()?;
        }
        Ok(())
    }

    fn close(&mut self) -> CoreResult<()> {
        first_error(self.writers.iter_mut().map(|w| w.close()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::RowCursor;
    use crate::value::ValueKind;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn column(name: &str) -> ColumnDescriptor {
        ColumnDescriptor::new(name, ValueKind::Any)
    }

    fn rows(names: &[&str], row_count: usize) -> RowCursor {
        RowCursor::new(
            names.iter().map(|n| column(n)).collect(),
            (0..row_count)
                .map(|r| names.iter().map(|n| Value::from(format!("{n}{r}"))).collect())
                .collect(),
        )
    }

    #[derive(Debug)]
    struct FailingClose;

    impl AttributeCursor for FailingClose {
        fn column_count(&self) -> usize {
            0
        }
        fn column_at(&self, index: usize) -> CoreResult<&ColumnDescriptor> {
            Err(CoreError::out_of_range(index, 0))
        }
        fn has_next(&mut self) -> CoreResult<bool> {
            Ok(false)
        }
        fn advance(&mut self) -> CoreResult<()> {
            Err(CoreError::no_such_element("empty"))
        }
        fn read(&mut self, index: usize) -> CoreResult<Value> {
            Err(CoreError::out_of_range(index, 0))
        }
        fn close(&mut self) -> CoreResult<()> {
            Err(CoreError::io_failure("disk gone"))
        }
    }

    #[test]
    fn maps_positions_to_constituents() {
        let mut joined = JoiningCursor::new(vec![
            Box::new(rows(&["x", "y"], 1)),
            Box::new(rows(&["z"], 1)),
        ]);
        assert_eq!(joined.column_count(), 3);
        assert_eq!(joined.column_at(2).unwrap().name(), "z");
        joined.advance().unwrap();
        assert_eq!(joined.read(2).unwrap(), Value::from("z0"));
        assert_eq!(joined.read(1).unwrap(), Value::from("y0"));
        assert!(matches!(joined.read(3), Err(CoreError::OutOfRange { index: 3, len: 3 })));
    }

    #[test]
    fn advances_while_any_constituent_has_rows() {
        let mut joined = JoiningCursor::new(vec![
            Box::new(rows(&["a"], 1)),
            Box::new(rows(&["b"], 2)),
        ]);
        joined.advance().unwrap();
        assert!(joined.has_next().unwrap());
        joined.advance().unwrap();
        assert_eq!(joined.read(1).unwrap(), Value::from("b1"));
        assert!(!joined.has_next().unwrap());
        assert!(joined.advance().is_err());
    }

    #[test]
    fn close_reports_first_error_after_closing_all() {
        let healthy = rows(&["a"], 1);
        let signal = healthy.close_signal();
        let mut joined = JoiningCursor::new(vec![Box::new(FailingClose), Box::new(healthy)]);
        assert!(joined.close().unwrap_err().is_io_failure());
        assert!(signal.is_raised());
    }

    /// What a `LoggedWriter` saw, shared with the test after boxing.
    #[derive(Debug, Default)]
    struct WriteLog {
        written: Vec<(String, Vec<Value>)>,
        removed: Vec<usize>,
        appended: usize,
        closed: bool,
    }

    /// Writer over fixed rows that appends blank rows past the end.
    #[derive(Debug)]
    struct LoggedWriter {
        columns: Vec<ColumnDescriptor>,
        rows: Vec<Vec<Value>>,
        next_row: usize,
        current: Option<(Option<usize>, Vec<Value>)>,
        close_error: Option<&'static str>,
        log: Arc<Mutex<WriteLog>>,
    }

    impl LoggedWriter {
        fn new(names: &[&str], row_count: usize) -> (Self, Arc<Mutex<WriteLog>>) {
            let log = Arc::new(Mutex::new(WriteLog::default()));
            let writer = Self {
                columns: names.iter().map(|n| column(n)).collect(),
                rows: (0..row_count)
                    .map(|r| names.iter().map(|n| Value::from(format!("{n}{r}"))).collect())
                    .collect(),
                next_row: 0,
                current: None,
                close_error: None,
                log: Arc::clone(&log),
            };
            (writer, log)
        }

        fn failing_close(mut self, message: &'static str) -> Self {
            self.close_error = Some(message);
            self
        }

        fn row(&mut self) -> CoreResult<&mut (Option<usize>, Vec<Value>)> {
            self.current
                .as_mut()
                .ok_or_else(|| CoreError::illegal_state("no current row"))
        }
    }

    impl AttributeWriter for LoggedWriter {
        fn column_count(&self) -> usize {
            self.columns.len()
        }
        fn column_at(&self, index: usize) -> CoreResult<&ColumnDescriptor> {
            self.columns
                .get(index)
                .ok_or_else(|| CoreError::out_of_range(index, self.columns.len()))
        }
        fn has_next(&mut self) -> CoreResult<bool> {
            Ok(self.next_row < self.rows.len())
        }
        fn advance(&mut self) -> CoreResult<()> {
            if self.next_row < self.rows.len() {
                self.current = Some((Some(self.next_row), self.rows[self.next_row].clone()));
                self.next_row += 1;
            } else {
                self.log.lock().appended += 1;
                self.current = Some((None, vec![Value::Null; self.columns.len()]));
            }
            Ok(())
        }
        fn read(&mut self, index: usize) -> CoreResult<Value> {
            let len = self.columns.len();
            let (_, values) = self.row()?;
            values.get(index).cloned().ok_or_else(|| CoreError::out_of_range(index, len))
        }
        fn write(&mut self, index: usize, value: Value) -> CoreResult<()> {
            let len = self.columns.len();
            let (_, values) = self.row()?;
            let slot = values.get_mut(index).ok_or_else(|| CoreError::out_of_range(index, len))?;
            *slot = value;
            Ok(())
        }
        fn write_row(&mut self, id: &RecordId) -> CoreResult<()> {
            let (_, values) = self.row()?.clone();
            self.log.lock().written.push((id.value(), values));
            Ok(())
        }
        fn remove_row(&mut self) -> CoreResult<()> {
            match self.current.take() {
                Some((Some(row), _)) => {
                    self.log.lock().removed.push(row);
                    Ok(())
                }
                _ => Err(CoreError::illegal_state("no stored row to remove")),
            }
        }
        fn close(&mut self) -> CoreResult<()> {
            self.log.lock().closed = true;
            match self.close_error {
                Some(message) => Err(CoreError::io_failure(message)),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn writer_routes_values_by_position() {
        let (left, left_log) = LoggedWriter::new(&["a", "b"], 1);
        let (right, right_log) = LoggedWriter::new(&["c"], 1);
        let mut joined = JoiningWriter::new(vec![Box::new(left), Box::new(right)]);
        assert_eq!(joined.column_count(), 3);
        assert_eq!(joined.column_at(2).unwrap().name(), "c");

        joined.advance().unwrap();
        joined.write(0, Value::from("A")).unwrap();
        joined.write(2, Value::from("C")).unwrap();
        assert_eq!(joined.read(2).unwrap(), Value::from("C"));
        assert_eq!(joined.read(1).unwrap(), Value::from("b0"));
        assert!(matches!(
            joined.write(3, Value::from("x")),
            Err(CoreError::OutOfRange { index: 3, len: 3 })
        ));

        joined.write_row(&RecordId::new("j.1")).unwrap();
        assert_eq!(
            left_log.lock().written,
            vec![("j.1".to_string(), vec![Value::from("A"), Value::from("b0")])]
        );
        assert_eq!(
            right_log.lock().written,
            vec![("j.1".to_string(), vec![Value::from("C")])]
        );
    }

    #[test]
    fn writer_advances_every_constituent_and_appends_at_the_end() {
        let (short, short_log) = LoggedWriter::new(&["a"], 1);
        let (long, long_log) = LoggedWriter::new(&["b"], 2);
        let mut joined = JoiningWriter::new(vec![Box::new(short), Box::new(long)]);

        joined.advance().unwrap();
        assert!(joined.has_next().unwrap());
        joined.advance().unwrap();
        assert_eq!(joined.read(0).unwrap(), Value::Null);
        assert_eq!(joined.read(1).unwrap(), Value::from("b1"));
        assert_eq!(short_log.lock().appended, 1);
        assert_eq!(long_log.lock().appended, 0);

        assert!(!joined.has_next().unwrap());
        joined.advance().unwrap();
        assert_eq!(short_log.lock().appended, 2);
        assert_eq!(long_log.lock().appended, 1);
        joined.write(1, Value::from("new")).unwrap();
        joined.write_row(&RecordId::new("j.3")).unwrap();
        assert_eq!(long_log.lock().written[0].1, vec![Value::from("new")]);
    }

    #[test]
    fn writer_removes_from_every_constituent() {
        let (left, left_log) = LoggedWriter::new(&["a"], 2);
        let (right, right_log) = LoggedWriter::new(&["b"], 2);
        let mut joined = JoiningWriter::new(vec![Box::new(left), Box::new(right)]);
        joined.advance().unwrap();
        joined.advance().unwrap();
        joined.remove_row().unwrap();
        assert_eq!(left_log.lock().removed, vec![1]);
        assert_eq!(right_log.lock().removed, vec![1]);
    }

    #[test]
    fn writer_close_reports_first_error_after_closing_all() {
        let (left, left_log) = LoggedWriter::new(&["a"], 1);
        let (middle, middle_log) = LoggedWriter::new(&["b"], 1);
        let (right, right_log) = LoggedWriter::new(&["c"], 1);
        let mut joined = JoiningWriter::new(vec![
            Box::new(left.failing_close("first disk")),
            Box::new(middle),
            Box::new(right.failing_close("second disk")),
        ]);

        let err = joined.close().unwrap_err();
        assert!(err.is_io_failure());
        assert!(err.to_string().contains("first disk"));
        assert!(left_log.lock().closed);
        assert!(middle_log.lock().closed);
        assert!(right_log.lock().closed);
    }

    #[test]
    fn empty_join() {
        let mut joined = JoiningCursor::new(Vec::new());
        assert_eq!(joined.column_count(), 0);
        assert!(!joined.has_next().unwrap());
        assert_eq!(joined.read_id().unwrap(), None);
    }

    proptest! {
        #[test]
        fn column_space_is_concatenation(widths in proptest::collection::vec(0usize..4, 0..6)) {
            let names: Vec<Vec<String>> = widths
                .iter()
                .enumerate()
                .map(|(c, w)| (0..*w).map(|i| format!("c{c}_{i}")).collect())
                .collect();
            let cursors: Vec<Box<dyn AttributeCursor + Send>> = names
                .iter()
                .map(|cols| {
                    let refs: Vec<&str> = cols.iter().map(String::as_str).collect();
                    Box::new(rows(&refs, 1)) as Box<dyn AttributeCursor + Send>
                })
                .collect();
            let joined = JoiningCursor::new(cursors);
            let expected: Vec<&String> = names.iter().flatten().collect();

            prop_assert_eq!(joined.column_count(), expected.len());
            for (p, name) in expected.iter().enumerate() {
                prop_assert_eq!(joined.column_at(p).unwrap().name(), name.as_str());
            }
            prop_assert!(joined.column_at(expected.len()).is_err());
        }
    }
}
