//! Transaction isolation and change notification routing.

use featurekit_core::cursor::{RecordCursor, RecordWriter};
use featurekit_core::{ChangeType, Config, Filter, Notification, Transaction, TransactionId, Value};
use featurekit_memory::{MemoryStore, Query};
use featurekit_testkit::prelude::*;
use std::sync::mpsc::Receiver;

fn drain(rx: &Receiver<Notification>) -> Vec<Notification> {
    rx.try_iter().collect()
}

fn named(name: &'static str) -> Filter {
    Filter::matching(name, move |r| r.get(0).ok().and_then(Value::as_str) == Some(name))
}

fn names(store: &MemoryStore, transaction: &Transaction) -> Vec<String> {
    store
        .query(ROAD, &Query::all(), transaction)
        .unwrap()
        .into_records()
        .map(|r| r.unwrap().get(0).unwrap().as_str().unwrap().to_string())
        .collect()
}

#[test]
fn commit_publishes_batch_to_everyone_else() {
    init_tracing();
    let store = TestStore::roads();
    let txn = Transaction::new();
    let other_txn = Transaction::new();

    let own = store.subscribe(ROAD, &txn);
    let auto = store.subscribe(ROAD, &Transaction::auto_commit());
    let other = store.subscribe(ROAD, &other_txn);

    let ids = store.add_records(ROAD, vec![road_row("r4", 3, 5)], &txn).unwrap();
    let temporary = ids[0].value();
    assert!(!temporary.starts_with("road."));

    let seen = drain(&own);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].change_type(), ChangeType::Added);
    assert_eq!(seen[0].source(), txn.id());
    assert!(drain(&auto).is_empty());
    assert!(drain(&other).is_empty());

    txn.commit().unwrap();
    assert!(drain(&own).is_empty());

    for rx in [&auto, &other] {
        let seen = drain(rx);
        assert_eq!(seen.len(), 1);
        let batch = seen[0].as_batch().expect("commit sends a batch");
        assert_eq!(batch.change_type(), ChangeType::Commit);
        assert_eq!(batch.source(), txn.id());
        assert_eq!(batch.bounds().min_x(), Some(5.0));
        assert_eq!(batch.created_ids()[0].value(), ids[0].value());
    }
    assert_eq!(store.count(ROAD).unwrap(), 4);
}

#[test]
fn commit_rewrites_temporary_ids_in_place() {
    let store = TestStore::roads_with_config(Config::new().temp_id_prefix("tmp"));
    let txn = Transaction::new();
    let _rx = store.subscribe(ROAD, &Transaction::auto_commit());

    let ids = store.add_records(ROAD, vec![road_row("r4", 1, 3), road_row("r5", 1, 4)], &txn).unwrap();
    assert!(ids.iter().all(|id| id.value().starts_with("tmp") && !id.is_rewritten()));

    txn.commit().unwrap();
    assert!(ids.iter().all(|id| id.value().starts_with("road.") && id.is_rewritten()));
    assert_ne!(ids[0].value(), ids[1].value());

    let committed: Vec<String> = store
        .reader(ROAD, &Transaction::auto_commit())
        .unwrap()
        .into_records()
        .map(|r| r.unwrap().id().value())
        .collect();
    assert!(committed.contains(&ids[0].value()));
    assert!(committed.contains(&ids[1].value()));
}

#[test]
fn ids_are_rewritten_without_batching() {
    let store = TestStore::roads_with_config(Config::new().batch_events(false));
    let txn = Transaction::new();
    let auto = store.subscribe(ROAD, &Transaction::auto_commit());

    let ids = store.add_records(ROAD, vec![road_row("r4", 1, 3)], &txn).unwrap();
    txn.commit().unwrap();

    assert!(ids[0].value().starts_with("road."));
    assert!(drain(&auto).is_empty());
}

#[test]
fn rollback_reports_only_to_own_subscribers() {
    let store = TestStore::roads();
    let txn = Transaction::new();
    let own = store.subscribe(ROAD, &txn);
    let auto = store.subscribe(ROAD, &Transaction::auto_commit());

    store.remove_records(ROAD, named("r2"), &txn).unwrap();
    assert_eq!(names(&store, &txn), vec!["r1", "r3"]);
    assert_eq!(names(&store, &Transaction::auto_commit()), vec!["r1", "r2", "r3"]);

    let removed = drain(&own);
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].change_type(), ChangeType::Removed);

    txn.rollback().unwrap();
    let seen = drain(&own);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].change_type(), ChangeType::Rollback);
    assert!(drain(&auto).is_empty());

    assert_eq!(names(&store, &txn), vec!["r1", "r2", "r3"]);
    assert_eq!(store.count(ROAD).unwrap(), 3);
}

#[test]
fn auto_commit_changes_reach_every_subscriber() {
    let store = TestStore::roads();
    let txn = Transaction::new();
    let in_txn = store.subscribe(ROAD, &txn);
    let auto = store.subscribe(ROAD, &Transaction::auto_commit());

    let modified = store
        .modify_records(ROAD, named("r1"), "lanes", Value::Integer(6), &Transaction::auto_commit())
        .unwrap();
    assert_eq!(modified, 1);

    for rx in [&in_txn, &auto] {
        let seen = drain(rx);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].change_type(), ChangeType::Modified);
        assert_eq!(seen[0].source(), TransactionId::AUTO_COMMIT);
    }
    assert!(store.registry().pending_batch(ROAD, TransactionId::AUTO_COMMIT).is_none());
}

#[test]
fn events_never_cross_transactions() {
    let store = TestStore::roads();
    let t1 = Transaction::new();
    let t2 = Transaction::new();
    let rx1 = store.subscribe(ROAD, &t1);
    let rx2 = store.subscribe(ROAD, &t2);

    store.add_records(ROAD, vec![road_row("a", 1, 7)], &t1).unwrap();
    store.remove_records(ROAD, named("r3"), &t2).unwrap();

    let seen1 = drain(&rx1);
    let seen2 = drain(&rx2);
    assert!(seen1.iter().all(|n| n.source() == t1.id()));
    assert!(seen2.iter().all(|n| n.source() == t2.id()));
    assert_eq!(seen1.len(), 1);
    assert_eq!(seen2.len(), 1);

    // Neither transaction sees the other's pending work.
    assert_eq!(names(&store, &t1), vec!["r1", "r2", "r3", "a"]);
    assert_eq!(names(&store, &t2), vec!["r1", "r2"]);
}

#[test]
fn batch_bounds_cover_old_and_new_extents() {
    let store = TestStore::roads();
    let txn = Transaction::new();
    let _rx = store.subscribe(ROAD, &txn);

    store.add_records(ROAD, vec![road_row("far", 1, 9)], &txn).unwrap();
    store
        .modify_records(ROAD, named("r1"), "lanes", Value::Integer(5), &txn)
        .unwrap();

    let batch = store.registry().pending_batch(ROAD, txn.id()).unwrap();
    assert_eq!(batch.change_type(), ChangeType::Modified);
    assert_eq!(batch.bounds().min_x(), Some(0.0));
    assert_eq!(batch.bounds().max_x(), Some(10.0));
    assert!(!batch.is_saturated());
    assert_eq!(batch.created_ids().len(), 1);
}

#[test]
fn appended_record_can_be_discarded_before_write() {
    let store = TestStore::roads();
    let txn = Transaction::new();
    let rx = store.subscribe(ROAD, &txn);

    let mut writer = store.writer_append(ROAD, &txn).unwrap();
    writer.next().unwrap().set_values(road_row("ghost", 1, 0)).unwrap();
    writer.remove().unwrap();
    writer.close().unwrap();

    assert!(drain(&rx).is_empty());
    txn.commit().unwrap();
    assert_eq!(store.count(ROAD).unwrap(), 3);
}

#[test]
fn closed_transaction_discards_pending_work() {
    let store = TestStore::roads();
    let txn = Transaction::new();
    store.add_records(ROAD, vec![road_row("r4", 1, 3)], &txn).unwrap();
    assert!(store.registry().pending_batch(ROAD, txn.id()).is_some());

    txn.close().unwrap();
    assert_eq!(store.count(ROAD).unwrap(), 3);
    assert!(store.registry().pending_batch(ROAD, txn.id()).is_none());
    assert!(txn.commit().is_err());
}
