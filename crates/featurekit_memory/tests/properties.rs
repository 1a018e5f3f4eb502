//! Property tests for the in-memory store.

use featurekit_core::cursor::RecordCursor;
use featurekit_core::{Filter, Transaction};
use featurekit_memory::Query;
use featurekit_testkit::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn committed_rows_are_all_visible(rows in rows_strategy(20)) {
        let store = TestStore::empty();
        let txn = Transaction::new();
        let ids = store.add_records(ROAD, rows.clone(), &txn).unwrap();
        prop_assert_eq!(store.count(ROAD).unwrap(), 0);

        txn.commit().unwrap();
        prop_assert_eq!(store.count(ROAD).unwrap(), rows.len());
        prop_assert!(ids.iter().all(|id| id.is_rewritten()));

        let read: Vec<_> = store
            .reader(ROAD, &Transaction::auto_commit())
            .unwrap()
            .into_records()
            .map(|r| r.unwrap().into_values())
            .collect();
        prop_assert_eq!(read, rows);
    }

    #[test]
    fn max_records_bounds_every_query(rows in rows_strategy(20), max in 0usize..25) {
        let store = TestStore::empty();
        let auto = Transaction::auto_commit();
        store.add_records(ROAD, rows.clone(), &auto).unwrap();

        let cursor = store.query(ROAD, &Query::all().max_records(max), &auto).unwrap();
        prop_assert_eq!(cursor.into_records().count(), rows.len().min(max));
    }

    #[test]
    fn removing_everything_empties_the_type(rows in rows_strategy(10)) {
        let store = TestStore::empty();
        let auto = Transaction::auto_commit();
        store.add_records(ROAD, rows.clone(), &auto).unwrap();

        let removed = store.remove_records(ROAD, Filter::Include, &auto).unwrap();
        prop_assert_eq!(removed, rows.len());
        prop_assert_eq!(store.count(ROAD).unwrap(), 0);
    }
}
