use crate::fixtures::addr;
use quorum_sync::domain::{TxOrigin, TxRecord, TxSnapshot, TxStatus};
use quorum_sync::foundation::TxId;
use quorum_sync::infrastructure::store::TransactionStore;

fn snapshot(id: u64, executed: bool, confirmations: &[u8]) -> TxSnapshot {
    TxSnapshot {
        id: TxId::new(id),
        record: TxRecord { destination: addr(0x99), value: 7, data: vec![1, 2, 3], executed },
        confirmations: confirmations.iter().map(|tag| addr(*tag)).collect(),
        remote_confirmed: executed,
    }
}

#[test]
fn upsert_creates_and_lists_in_id_order() {
    let store = TransactionStore::new();
    store.upsert_snapshot(snapshot(2, false, &[1])).unwrap();
    store.upsert_snapshot(snapshot(0, false, &[1])).unwrap();
    store.upsert_snapshot(snapshot(1, false, &[2])).unwrap();

    let ids: Vec<u64> = store.list().unwrap().iter().map(|tx| tx.id.value()).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn confirmation_events_are_idempotent() {
    let store = TransactionStore::new();
    store.upsert_snapshot(snapshot(0, false, &[])).unwrap();

    assert!(store.apply_confirmation(TxId::new(0), addr(1)).unwrap());
    assert!(!store.apply_confirmation(TxId::new(0), addr(1)).unwrap());

    let tx = store.get(TxId::new(0)).unwrap().unwrap();
    assert_eq!(tx.confirmations.len(), 1);
}

#[test]
fn terminal_state_blocks_later_mutation() {
    let store = TransactionStore::new();
    store.upsert_snapshot(snapshot(0, true, &[1, 2])).unwrap();

    // Events for an executed transaction are no-ops.
    assert!(!store.apply_confirmation(TxId::new(0), addr(3)).unwrap());
    assert!(!store.apply_revocation(TxId::new(0), addr(1)).unwrap());

    // A conflicting snapshot cannot un-execute or shrink confirmations.
    store.upsert_snapshot(snapshot(0, false, &[1])).unwrap();
    let tx = store.get(TxId::new(0)).unwrap().unwrap();
    assert!(tx.executed);
    assert_eq!(tx.confirmations.len(), 2);
}

#[test]
fn executed_entry_still_accepts_late_confirmation_union() {
    let store = TransactionStore::new();
    store.upsert_snapshot(snapshot(0, true, &[1])).unwrap();
    store.upsert_snapshot(snapshot(0, true, &[1, 2])).unwrap();

    let tx = store.get(TxId::new(0)).unwrap().unwrap();
    assert!(tx.executed);
    assert_eq!(tx.confirmations.len(), 2);
}

#[test]
fn convergence_is_order_independent() {
    // Execution snapshot first, stale confirmation event second.
    let forward = TransactionStore::new();
    forward.upsert_snapshot(snapshot(0, false, &[1])).unwrap();
    forward.upsert_snapshot(snapshot(0, true, &[1, 2])).unwrap();
    forward.apply_confirmation(TxId::new(0), addr(2)).unwrap();

    // Confirmation event first, execution snapshot second.
    let reverse = TransactionStore::new();
    reverse.upsert_snapshot(snapshot(0, false, &[1])).unwrap();
    reverse.apply_confirmation(TxId::new(0), addr(2)).unwrap();
    reverse.upsert_snapshot(snapshot(0, true, &[1, 2])).unwrap();

    let a = forward.get(TxId::new(0)).unwrap().unwrap();
    let b = reverse.get(TxId::new(0)).unwrap().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.status(), TxStatus::Executed);
    assert_eq!(a.confirmations.len(), 2);
}

#[test]
fn optimistic_entry_is_replaced_not_merged() {
    let store = TransactionStore::new();
    assert!(store.insert_optimistic(TxId::new(0), addr(0x99), 7, vec![1], addr(1)).unwrap());

    let tx = store.get(TxId::new(0)).unwrap().unwrap();
    assert_eq!(tx.origin, TxOrigin::Optimistic);

    // Authoritative read replaces the optimistic entry wholesale.
    store.upsert_snapshot(snapshot(0, false, &[2])).unwrap();
    let tx = store.get(TxId::new(0)).unwrap().unwrap();
    assert_eq!(tx.origin, TxOrigin::Authoritative);
    assert!(!tx.confirmations.contains(&addr(1)));
    assert!(tx.confirmations.contains(&addr(2)));
}

#[test]
fn optimistic_insert_never_clobbers_existing_entry() {
    let store = TransactionStore::new();
    store.upsert_snapshot(snapshot(0, false, &[2])).unwrap();
    assert!(!store.insert_optimistic(TxId::new(0), addr(0x99), 7, vec![], addr(1)).unwrap());

    let tx = store.get(TxId::new(0)).unwrap().unwrap();
    assert_eq!(tx.origin, TxOrigin::Authoritative);
}

#[test]
fn failure_flag_survives_snapshot_refresh() {
    let store = TransactionStore::new();
    store.upsert_snapshot(snapshot(0, false, &[1, 2])).unwrap();
    assert!(store.mark_failure_observed(TxId::new(0)).unwrap());

    // The targeted re-fetch after an ExecutionFailure still reports
    // executed=false; the observed failure must not be forgotten.
    store.upsert_snapshot(snapshot(0, false, &[1, 2])).unwrap();
    let tx = store.get(TxId::new(0)).unwrap().unwrap();
    assert_eq!(tx.status(), TxStatus::Failed);
    assert!(!tx.executed);
}

#[test]
fn confirmation_snapshot_replaces_for_pending_only() {
    let store = TransactionStore::new();
    store.upsert_snapshot(snapshot(0, false, &[1, 2])).unwrap();
    store.apply_confirmation_snapshot(TxId::new(0), vec![addr(2)], false).unwrap();
    assert_eq!(store.get(TxId::new(0)).unwrap().unwrap().confirmations.len(), 1);

    store.upsert_snapshot(snapshot(1, true, &[1, 2])).unwrap();
    store.apply_confirmation_snapshot(TxId::new(1), vec![addr(3)], false).unwrap();
    // Executed: union only, nothing removed.
    assert_eq!(store.get(TxId::new(1)).unwrap().unwrap().confirmations.len(), 3);
}
