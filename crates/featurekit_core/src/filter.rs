//! Predicates over records.
//!
//! The predicate language itself lives outside this crate; it plugs in
//! through [`Predicate`]. [`Filter`] adds the distinguished constants the
//! cursors and the batch aggregator need to recognise: match everything,
//! match nothing, identifier sets and conjunctions.

use crate::record::{Record, RecordId};
use std::fmt;
use std::sync::Arc;

/// An externally defined predicate.
pub trait Predicate: Send + Sync + fmt::Debug {
    /// Returns true if `record` satisfies the predicate.
    fn evaluate(&self, record: &Record) -> bool;
}

/// A predicate built from a closure, labelled for debugging.
pub struct FnPredicate<F> {
    label: String,
    f: F,
}

impl<F> FnPredicate<F>
where
    F: Fn(&Record) -> bool + Send + Sync,
{
    /// Wraps `f` under `label`.
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&Record) -> bool + Send + Sync,
{
    fn evaluate(&self, record: &Record) -> bool {
        (self.f)(record)
    }
}

impl<F> fmt::Debug for FnPredicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnPredicate({})", self.label)
    }
}

/// A filter over records.
#[derive(Clone, Debug)]
pub enum Filter {
    /// Matches every record.
    Include,
    /// Matches no record.
    Exclude,
    /// Matches records whose identifier is in the set.
    ///
    /// The set holds identifier handles, so it follows in-place rewrites.
    Ids(Vec<RecordId>),
    /// Matches records satisfying every child.
    And(Vec<Filter>),
    /// An externally defined predicate.
    Custom(Arc<dyn Predicate>),
}

impl Filter {
    /// Identifier-set filter from plain values.
    pub fn ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RecordId>,
    {
        Filter::Ids(ids.into_iter().map(Into::into).collect())
    }

    /// Identifier-set filter sharing the given handles.
    pub fn id_handles(ids: impl IntoIterator<Item = RecordId>) -> Self {
        Filter::Ids(ids.into_iter().collect())
    }

    /// Wraps an external predicate.
    pub fn custom(predicate: impl Predicate + 'static) -> Self {
        Filter::Custom(Arc::new(predicate))
    }

    /// Filter from a closure.
    pub fn matching<F>(label: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Filter::custom(FnPredicate::new(label, f))
    }

    /// Conjunction of two filters.
    #[must_use]
    pub fn and(a: Filter, b: Filter) -> Self {
        Filter::And(vec![a, b])
    }

    /// Appends `other` as a conjunct, wrapping `self` when it is not a conjunction.
    #[must_use]
    pub fn with_conjunct(self, other: Filter) -> Self {
        match self {
            Filter::And(mut children) => {
                children.push(other);
                Filter::And(children)
            }
            current => Filter::And(vec![current, other]),
        }
    }

    /// Evaluates the filter against a record.
    #[must_use]
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            Filter::Include => true,
            Filter::Exclude => false,
            Filter::Ids(ids) => {
                let id = record.id().value();
                ids.iter().any(|candidate| candidate.matches(&id))
            }
            Filter::And(children) => children.iter().all(|child| child.evaluate(record)),
            Filter::Custom(predicate) => predicate.evaluate(record),
        }
    }

    /// True for [`Filter::Include`].
    #[must_use]
    pub fn is_include(&self) -> bool {
        matches!(self, Filter::Include)
    }

    /// True for [`Filter::Exclude`].
    #[must_use]
    pub fn is_exclude(&self) -> bool {
        matches!(self, Filter::Exclude)
    }

    /// The identifier handles of an identifier-set filter.
    #[must_use]
    pub fn identifiers(&self) -> Option<&[RecordId]> {
        match self {
            Filter::Ids(ids) => Some(ids),
            _ => None,
        }
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Filter::Include, Filter::Include) | (Filter::Exclude, Filter::Exclude) => true,
            (Filter::Ids(a), Filter::Ids(b)) => a == b,
            (Filter::And(a), Filter::And(b)) => a == b,
            (Filter::Custom(a), Filter::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Include
    }
}
