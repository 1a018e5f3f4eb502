//! Change notifications for record types.
//!
//! Writers describe each change as a [`ChangeEvent`]: what kind of change, the
//! region it touched and a filter naming the records involved. Explicit
//! transactions fold their events into a [`BatchChangeEvent`] that summarizes
//! the whole transaction at commit or rollback. Subscribers receive both kinds
//! through the [`ListenerRegistry`] as a [`Notification`].

mod batch;
mod registry;

pub use batch::BatchChangeEvent;
pub use registry::ListenerRegistry;

use crate::envelope::Envelope;
use crate::filter::Filter;
use crate::types::TransactionId;
use std::fmt;

/// Kind of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    /// Records were appended.
    Added,
    /// Records were updated.
    Modified,
    /// Records were deleted.
    Removed,
    /// A transaction committed its changes.
    Commit,
    /// A transaction discarded its changes.
    Rollback,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

/// One change to records of a type.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    type_name: String,
    source: TransactionId,
    change_type: ChangeType,
    bounds: Envelope,
    filter: Filter,
}

impl ChangeEvent {
    /// Creates an event.
    pub fn new(
        type_name: impl Into<String>,
        source: TransactionId,
        change_type: ChangeType,
        bounds: Envelope,
        filter: Filter,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            source,
            change_type,
            bounds,
            filter,
        }
    }

    /// Name of the record type changed.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Transaction the change was made under.
    pub fn source(&self) -> TransactionId {
        self.source
    }

    /// Kind of change.
    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    /// Region touched; null when unknown or empty.
    pub fn bounds(&self) -> &Envelope {
        &self.bounds
    }

    /// Records involved.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// True when the event may cover every record of the type.
    pub fn is_unbounded(&self) -> bool {
        self.filter.is_include()
    }
}

/// What subscribers receive.
#[derive(Debug, Clone)]
pub enum Notification {
    /// A single change.
    Change(ChangeEvent),
    /// The summary of an explicit transaction.
    Batch(BatchChangeEvent),
}

impl Notification {
    /// Name of the record type changed.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Change(e) => e.type_name(),
            Self::Batch(b) => b.type_name(),
        }
    }

    /// Transaction the change was made under.
    pub fn source(&self) -> TransactionId {
        match self {
            Self::Change(e) => e.source(),
            Self::Batch(b) => b.source(),
        }
    }

    /// Kind of change.
    pub fn change_type(&self) -> ChangeType {
        match self {
            Self::Change(e) => e.change_type(),
            Self::Batch(b) => b.change_type(),
        }
    }

    /// Region touched.
    pub fn bounds(&self) -> &Envelope {
        match self {
            Self::Change(e) => e.bounds(),
            Self::Batch(b) => b.bounds(),
        }
    }

    /// Records involved.
    pub fn filter(&self) -> &Filter {
        match self {
            Self::Change(e) => e.filter(),
            Self::Batch(b) => b.filter(),
        }
    }

    /// The batch summary, if this is one.
    pub fn as_batch(&self) -> Option<&BatchChangeEvent> {
        match self {
            Self::Batch(b) => Some(b),
            Self::Change(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_filter_is_unbounded() {
        let event = ChangeEvent::new(
            "road",
            TransactionId::AUTO_COMMIT,
            ChangeType::Modified,
            Envelope::null(),
            Filter::Include,
        );
        assert!(event.is_unbounded());
        let note = Notification::Change(event);
        assert_eq!(note.type_name(), "road");
        assert!(note.as_batch().is_none());
    }

    #[test]
    fn change_type_display() {
        assert_eq!(ChangeType::Added.to_string(), "added");
        assert_eq!(ChangeType::Rollback.to_string(), "rollback");
    }
}
