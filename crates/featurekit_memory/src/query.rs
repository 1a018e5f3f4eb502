//! Read requests against a store.

use featurekit_core::Filter;

/// Which records to read and how many.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Records must satisfy this filter.
    pub filter: Filter,
    /// Upper bound on the number of records returned.
    pub max_records: Option<usize>,
}

impl Query {
    /// Every record.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Records matching `filter`.
    #[must_use]
    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            max_records: None,
        }
    }

    /// Limits the number of records returned.
    #[must_use]
    pub fn max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }
}
