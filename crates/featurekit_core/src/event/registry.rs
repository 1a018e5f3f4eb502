//! Delivery of change notifications to subscribers.

use super::{BatchChangeEvent, ChangeEvent, ChangeType, Notification};
use crate::config::Config;
use crate::error::CoreResult;
use crate::transaction::Transaction;
use crate::types::TransactionId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::debug;

struct Subscriber {
    type_name: String,
    transaction: TransactionId,
    sender: Sender<Notification>,
}

/// Routes change notifications by record type and transaction.
///
/// - Auto-Commit changes reach every subscriber of the type at once.
/// - Changes made in an explicit transaction reach only the subscribers
///   registered under that transaction, and are folded into its batch.
/// - At commit the batch goes to every other subscriber of the type; at
///   rollback it goes back to the transaction's own subscribers only.
///
/// Subscribers whose receiver was dropped are pruned on the next delivery.
pub struct ListenerRegistry {
    batch_events: bool,
    subscribers: RwLock<Vec<Subscriber>>,
    batches: Mutex<HashMap<(String, TransactionId), BatchChangeEvent>>,
}

impl ListenerRegistry {
    /// Creates a registry with default settings.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Creates a registry using `config`.
    pub fn with_config(config: &Config) -> Self {
        Self {
            batch_events: config.batch_events,
            subscribers: RwLock::new(Vec::new()),
            batches: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribes to changes of `type_name` as seen from `transaction`.
    pub fn subscribe(&self, type_name: &str, transaction: &Transaction) -> Receiver<Notification> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(Subscriber {
            type_name: type_name.to_string(),
            transaction: transaction.id(),
            sender: tx,
        });
        rx
    }

    /// Delivers one change.
    pub fn notify(&self, event: ChangeEvent) {
        let source = event.source();
        if !source.is_auto_commit() && self.batch_events {
            self.batches
                .lock()
                .entry((event.type_name().to_string(), source))
                .or_insert_with(|| BatchChangeEvent::new(event.type_name(), source))
                .add(&event);
        }
        let type_name = event.type_name().to_string();
        let delivered = self.deliver(&Notification::Change(event), |s| {
            s.type_name == type_name && (source.is_auto_commit() || s.transaction == source)
        });
        debug!(type_name = %type_name, transaction = %source, delivered, "change delivered");
    }

    /// Rewrites a temporary identifier tracked by the batch of `transaction`.
    ///
    /// Returns `false` when the batch does not track `old`.
    pub fn replace_identifier(
        &self,
        type_name: &str,
        transaction: TransactionId,
        old: &str,
        new: &str,
    ) -> CoreResult<bool> {
        let mut batches = self.batches.lock();
        let Some(batch) = batches.get_mut(&(type_name.to_string(), transaction)) else {
            return Ok(false);
        };
        let replaced = batch.replace_identifier(old, new)?;
        if replaced {
            debug!(type_name, %transaction, old, new, "identifier rewritten");
        }
        Ok(replaced)
    }

    /// Announces a commit of `transaction` to everyone outside it.
    ///
    /// Returns `false` when the transaction made no changes to the type.
    pub fn fire_commit(&self, type_name: &str, transaction: TransactionId) -> bool {
        let Some(mut batch) = self.take_batch(type_name, transaction) else {
            return false;
        };
        batch.set_change_type(ChangeType::Commit);
        let delivered = self.deliver(&Notification::Batch(batch), |s| {
            s.type_name == type_name && s.transaction != transaction
        });
        debug!(type_name, %transaction, delivered, "commit batch delivered");
        true
    }

    /// Announces a rollback of `transaction` to its own subscribers.
    ///
    /// Returns `false` when the transaction made no changes to the type.
    pub fn fire_rollback(&self, type_name: &str, transaction: TransactionId) -> bool {
        let Some(mut batch) = self.take_batch(type_name, transaction) else {
            return false;
        };
        batch.set_change_type(ChangeType::Rollback);
        let delivered = self.deliver(&Notification::Batch(batch), |s| {
            s.type_name == type_name && s.transaction == transaction
        });
        debug!(type_name, %transaction, delivered, "rollback batch delivered");
        true
    }

    /// Drops the batch of `transaction` without delivering it.
    ///
    /// Returns `false` when no batch was pending.
    pub fn discard_batch(&self, type_name: &str, transaction: TransactionId) -> bool {
        let discarded = self.take_batch(type_name, transaction).is_some();
        if discarded {
            debug!(type_name, %transaction, "batch discarded");
        }
        discarded
    }

    /// Number of live subscribers of `type_name`.
    pub fn subscriber_count(&self, type_name: &str) -> usize {
        self.subscribers
            .read()
            .iter()
            .filter(|s| s.type_name == type_name)
            .count()
    }

    /// Snapshot of the batch pending for `transaction`.
    pub fn pending_batch(&self, type_name: &str, transaction: TransactionId) -> Option<BatchChangeEvent> {
        self.batches
            .lock()
            .get(&(type_name.to_string(), transaction))
            .cloned()
    }

    fn take_batch(&self, type_name: &str, transaction: TransactionId) -> Option<BatchChangeEvent> {
        self.batches
            .lock()
            .remove(&(type_name.to_string(), transaction))
    }

    /// Sends `note` to matching subscribers, dropping disconnected ones.
    fn deliver(&self, note: &Notification, matches: impl Fn(&Subscriber) -> bool) -> usize {
        let mut delivered = 0;
        self.subscribers.write().retain(|s| {
            if !matches(s) {
                return true;
            }
            let alive = s.sender.send(note.clone()).is_ok();
            if alive {
                delivered += 1;
            }
            alive
        });
        delivered
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("batch_events", &self.batch_events)
            .field("subscribers", &self.subscribers.read().len())
            .field("pending_batches", &self.batches.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Envelope;
    use crate::filter::Filter;

    fn change(source: TransactionId) -> ChangeEvent {
        ChangeEvent::new(
            "road",
            source,
            ChangeType::Added,
            Envelope::new(0.0, 1.0, 0.0, 1.0),
            Filter::ids(["new1"]),
        )
    }

    #[test]
    fn auto_commit_changes_reach_everyone() {
        let registry = ListenerRegistry::new();
        let auto = Transaction::auto_commit();
        let txn = Transaction::new();
        let a = registry.subscribe("road", &auto);
        let b = registry.subscribe("road", &txn);
        let other = registry.subscribe("river", &auto);

        registry.notify(change(auto.id()));
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn transaction_changes_stay_inside_until_commit() {
        let registry = ListenerRegistry::new();
        let auto = Transaction::auto_commit();
        let txn = Transaction::new();
        let outside = registry.subscribe("road", &auto);
        let inside = registry.subscribe("road", &txn);

        registry.notify(change(txn.id()));
        assert!(inside.try_recv().is_ok());
        assert!(outside.try_recv().is_err());
        assert!(registry.pending_batch("road", txn.id()).is_some());

        assert!(registry.fire_commit("road", txn.id()));
        let note = outside.try_recv().unwrap();
        assert_eq!(note.change_type(), ChangeType::Commit);
        assert_eq!(note.bounds(), &Envelope::new(0.0, 1.0, 0.0, 1.0));
        assert!(inside.try_recv().is_err());
        assert!(!registry.fire_commit("road", txn.id()));
    }

    #[test]
    fn rollback_goes_to_own_subscribers() {
        let registry = ListenerRegistry::new();
        let auto = Transaction::auto_commit();
        let txn = Transaction::new();
        let outside = registry.subscribe("road", &auto);
        let inside = registry.subscribe("road", &txn);

        registry.notify(change(txn.id()));
        inside.try_recv().unwrap();
        assert!(registry.fire_rollback("road", txn.id()));
        assert_eq!(inside.try_recv().unwrap().change_type(), ChangeType::Rollback);
        assert!(outside.try_recv().is_err());
    }

    #[test]
    fn batching_can_be_disabled() {
        let registry = ListenerRegistry::with_config(&Config::new().batch_events(false));
        let txn = Transaction::new();
        registry.notify(change(txn.id()));
        assert!(registry.pending_batch("road", txn.id()).is_none());
        assert!(!registry.fire_commit("road", txn.id()));
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let registry = ListenerRegistry::new();
        let auto = Transaction::auto_commit();
        let rx = registry.subscribe("road", &auto);
        let _kept = registry.subscribe("road", &auto);
        assert_eq!(registry.subscriber_count("road"), 2);
        drop(rx);
        registry.notify(change(auto.id()));
        assert_eq!(registry.subscriber_count("road"), 1);
    }

    #[test]
    fn identifier_rewrite_without_batch_is_not_found() {
        let registry = ListenerRegistry::new();
        assert!(!registry
            .replace_identifier("road", TransactionId::new(99), "new1", "road.1")
            .unwrap());
    }
}
