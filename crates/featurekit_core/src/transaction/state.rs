//! Per-transaction state hooks.

use crate::error::CoreResult;
use crate::types::TransactionId;
use std::any::Any;
use std::sync::Arc;

/// State a backend attaches to an explicit transaction.
///
/// The transaction calls these hooks as it moves through its lifecycle. A
/// state typically buffers changes and applies or discards them at
/// [`commit`](TransactionState::commit) or
/// [`rollback`](TransactionState::rollback). Hooks take `&self`;
/// implementations guard their own data.
pub trait TransactionState: Send + Sync {
    /// Called with `Some(id)` when attached and `None` when detached.
    fn set_transaction(&self, transaction: Option<TransactionId>) -> CoreResult<()>;

    /// Called for every authorization added to the transaction.
    fn add_authorization(&self, authorization: &str) -> CoreResult<()>;

    /// Applies buffered changes.
    fn commit(&self) -> CoreResult<()>;

    /// Discards buffered changes.
    fn rollback(&self) -> CoreResult<()>;

    /// Upcast used for typed lookup with `Transaction::get_state_as`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
