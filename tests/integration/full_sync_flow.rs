//! Two-owner happy path: submit, confirm from the second owner, observe the
//! execution converge into the local cache.

use crate::fixtures::{addr, test_pair, test_runtime, wait_until, RecordingObserver};
use quorum_sync::application::{SyncSession, SyncState};
use quorum_sync::domain::TxStatus;
use quorum_sync::infrastructure::gateway::{LedgerGateway, MockContract};
use std::sync::Arc;

#[tokio::test]
async fn submit_confirm_execute_converges() {
    let wallet = addr(0xee);
    let contract = MockContract::new(wallet, vec![addr(1), addr(2)], 2);
    let observer = Arc::new(RecordingObserver::new());
    let session = SyncSession::start(
        test_pair(wallet, addr(1)),
        &test_runtime(),
        Arc::new(contract.connect(addr(1))),
        observer.clone(),
    );
    assert!(wait_until(|| session.sync_state() == SyncState::Synced, 2_000).await);

    let id = session.executor().submit_transaction(addr(9), 5, vec![]).await.unwrap();
    let store = Arc::clone(session.transactions());

    // Pending with only the submitter's auto-confirmation.
    assert!(
        wait_until(
            || {
                store
                    .get(id)
                    .unwrap()
                    .map(|tx| tx.status() == TxStatus::Pending && tx.confirmations.contains(&addr(1)) && tx.confirmations.len() == 1)
                    .unwrap_or(false)
            },
            2_000,
        )
        .await
    );

    // The second owner confirms out-of-band; quorum executes remotely.
    let second_owner = contract.connect(addr(2));
    second_owner.confirm_transaction(id).await.unwrap();

    assert!(
        wait_until(
            || {
                store
                    .get(id)
                    .unwrap()
                    .map(|tx| tx.status() == TxStatus::Executed && tx.confirmations.len() == 2)
                    .unwrap_or(false)
            },
            2_000,
        )
        .await
    );

    // Terminal protection: nothing mutates an executed entry.
    assert!(!store.apply_revocation(id, addr(1)).unwrap());
    assert!(!store.apply_confirmation(id, addr(3)).unwrap());
    let tx = store.get(id).unwrap().unwrap();
    assert!(tx.executed);
    assert_eq!(tx.confirmations.len(), 2);

    session.shutdown().await.unwrap();
}
