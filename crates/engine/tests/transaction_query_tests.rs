//! Queries executed inside transactions: overlay-aware candidates,
//! merged-state filtering, and mutative query forms.

use lode_engine::{Record, Rid, Store};
use serde_json::json;

fn rec(v: serde_json::Value) -> Record {
    Record::try_from(v).unwrap()
}

fn event_store() -> Store {
    let store = Store::new();
    store
        .create_many(vec![
            rec(json!({"id": 1, "type": "press", "char": "x", "time": 1})),
            rec(json!({"id": 2, "type": "click", "button": "L", "time": 2})),
            rec(json!({"id": 3, "type": "click", "button": "R", "time": 3})),
            rec(json!({"id": 4, "type": "press", "char": "y", "time": 4})),
        ])
        .unwrap();
    store
}

#[test]
fn test_query_sees_overlay_creates() {
    let store = event_store();
    let row = Store::symbol();
    let tx = store.transaction();
    tx.create(rec(json!({"id": 5, "type": "press", "char": "z", "time": 5})))
        .unwrap();

    let presses = tx
        .select([])
        .where_(row.attr("type").eq("press"))
        .fetch()
        .unwrap();
    assert_eq!(presses.len(), 3);

    // Base store is unaffected until commit.
    let base_presses = store
        .select([])
        .where_(row.attr("type").eq("press"))
        .count()
        .unwrap();
    assert_eq!(base_presses, 2);
}

#[test]
fn test_query_excludes_tombstoned_records() {
    let store = event_store();
    let row = Store::symbol();
    let tx = store.transaction();
    tx.delete(&1.into()).unwrap();

    let presses = tx
        .select([])
        .where_(row.attr("type").eq("press"))
        .fetch()
        .unwrap();
    assert_eq!(presses.len(), 1);
    assert!(presses.contains_key(&Rid::from(4)));
}

#[test]
fn test_overlay_update_makes_record_match() {
    // The base index says time=1; the overlay moves it past the threshold.
    // The merged evaluation must admit it despite the index miss.
    let store = event_store();
    let row = Store::symbol();
    let tx = store.transaction();
    tx.update(&1.into(), rec(json!({"time": 100}))).unwrap();

    let late = tx
        .select([])
        .where_(row.attr("time").gt(50))
        .fetch()
        .unwrap();
    assert_eq!(late.len(), 1);
    assert!(late.contains_key(&Rid::from(1)));
}

#[test]
fn test_overlay_update_makes_record_stop_matching() {
    // The base index still matches, but the merged state must not.
    let store = event_store();
    let row = Store::symbol();
    let tx = store.transaction();
    tx.update(&3.into(), rec(json!({"time": 0}))).unwrap();

    let late = tx
        .select([])
        .where_(row.attr("time").gt(2))
        .fetch()
        .unwrap();
    assert_eq!(late.len(), 1);
    assert!(late.contains_key(&Rid::from(4)));
}

#[test]
fn test_mutative_query_delete_in_transaction() {
    let store = event_store();
    let row = Store::symbol();
    let tx = store.transaction();

    let deleted = tx
        .select([])
        .where_(row.attr("type").eq("click") & row.attr("time").gt(2))
        .delete()
        .unwrap();
    assert_eq!(deleted, 1);

    // The delete is buffered: visible inside, invisible outside.
    assert!(tx.get(&3.into()).unwrap_err().is_not_found());
    assert!(store.contains(&3.into()));

    tx.commit().unwrap();
    assert!(!store.contains(&3.into()));
    assert_eq!(store.len(), 3);
}

#[test]
fn test_mutative_query_update_in_transaction() {
    let store = event_store();
    let row = Store::symbol();
    let tx = store.transaction();

    let patched = tx
        .select([])
        .where_(row.attr("char").one_of(["x", "y", "z"]))
        .update(rec(json!({"seen": true})))
        .unwrap();
    assert_eq!(patched, 2);

    assert!(!store.get(&1.into()).unwrap().contains_key("seen"));
    tx.commit().unwrap();
    assert_eq!(store.get(&1.into()).unwrap().get("seen").unwrap(), true.into());
    assert_eq!(store.get(&4.into()).unwrap().get("seen").unwrap(), true.into());
}

#[test]
fn test_query_ordering_spans_overlay_and_base() {
    let store = event_store();
    let row = Store::symbol();
    let tx = store.transaction();
    tx.create(rec(json!({"id": 5, "type": "scroll", "time": 0})))
        .unwrap();

    let ordered: Vec<Rid> = tx
        .select([])
        .order_by([row.attr("time").asc()])
        .fetch()
        .unwrap()
        .into_keys()
        .collect();
    assert_eq!(
        ordered,
        vec![5.into(), 1.into(), 2.into(), 3.into(), 4.into()]
    );
}

#[test]
fn test_projection_through_transaction() {
    let store = event_store();
    let row = Store::symbol();
    let tx = store.transaction();
    tx.update(&2.into(), rec(json!({"button": "M"}))).unwrap();

    let rows = tx
        .select([row.attr("button")])
        .where_(row.attr("type").eq("click"))
        .rows()
        .unwrap();
    assert_eq!(rows[&Rid::from(2)].get("button").unwrap(), &"M".into());
    assert_eq!(rows[&Rid::from(3)].get("button").unwrap(), &"R".into());
}

#[test]
fn test_query_on_closed_transaction_fails() {
    let store = event_store();
    let tx = store.transaction();
    let query = tx.select([]);
    tx.rollback().unwrap();
    assert!(query.fetch().unwrap_err().is_transaction_error());
}
