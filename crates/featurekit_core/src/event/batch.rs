//! Aggregation of one transaction's changes.

use super::{ChangeEvent, ChangeType};
use crate::envelope::Envelope;
use crate::error::CoreResult;
use crate::filter::Filter;
use crate::record::{RecordId, WeakRecordId};
use crate::types::TransactionId;

/// Summary of every change made to one record type in one transaction.
///
/// The region and the filter only ever widen. Identifiers of added records
/// are tracked weakly so their temporary values can be replaced in place
/// when the backend assigns permanent ones.
#[derive(Debug, Clone)]
pub struct BatchChangeEvent {
    type_name: String,
    source: TransactionId,
    change_type: ChangeType,
    bounds: Envelope,
    filter: Filter,
    created: Vec<WeakRecordId>,
}

impl BatchChangeEvent {
    /// Creates an empty batch: nothing matched, no region, `Modified`.
    pub fn new(type_name: impl Into<String>, source: TransactionId) -> Self {
        Self {
            type_name: type_name.into(),
            source,
            change_type: ChangeType::Modified,
            bounds: Envelope::null(),
            filter: Filter::Exclude,
            created: Vec::new(),
        }
    }

    /// Folds `event` into the batch.
    pub fn add(&mut self, event: &ChangeEvent) {
        if event.change_type() == ChangeType::Added {
            if let Some(ids) = event.filter().identifiers() {
                self.created.retain(WeakRecordId::is_live);
                self.created.extend(ids.iter().map(RecordId::downgrade));
            }
        }
        if self.filter.is_include() {
            return;
        }
        if event.filter().is_include() {
            self.filter = Filter::Include;
            return;
        }
        self.bounds.expand_to_include(event.bounds());
        let incoming = event.filter().clone();
        self.filter = match std::mem::take(&mut self.filter) {
            Filter::Exclude => incoming,
            current => current.with_conjunct(incoming),
        };
    }

    /// Rewrites the first live tracked identifier equal to `old`.
    ///
    /// Returns `false` when no tracked identifier matches.
    ///
    /// # Errors
    ///
    /// `IllegalState` if the matching handle was already rewritten.
    pub fn replace_identifier(&mut self, old: &str, new: &str) -> CoreResult<bool> {
        self.created.retain(WeakRecordId::is_live);
        let found = self
            .created
            .iter()
            .filter_map(WeakRecordId::upgrade)
            .find(|id| id.matches(old));
        match found {
            Some(id) => {
                id.rewrite(new)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Forces the change type, used to mark commit and rollback.
    pub fn set_change_type(&mut self, change_type: ChangeType) {
        self.change_type = change_type;
    }

    /// Live identifiers of records added in the transaction.
    pub fn created_ids(&self) -> Vec<RecordId> {
        self.created.iter().filter_map(WeakRecordId::upgrade).collect()
    }

    /// True once the batch covers every record of the type.
    pub fn is_saturated(&self) -> bool {
        self.filter.is_include()
    }

    /// Name of the record type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Transaction summarized.
    pub fn source(&self) -> TransactionId {
        self.source
    }

    /// Kind of change.
    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    /// Union of the regions of every folded event.
    pub fn bounds(&self) -> &Envelope {
        &self.bounds
    }

    /// Combined filter of every folded event.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }
}
