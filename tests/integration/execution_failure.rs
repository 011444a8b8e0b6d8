//! Quorum reached but the underlying call reverts: the ExecutionFailure event
//! is the only signal that turns a pending transaction into a failed one.

use crate::fixtures::{addr, test_pair, test_runtime, wait_until, RecordingObserver};
use quorum_sync::application::{SyncSession, SyncState};
use quorum_sync::domain::TxStatus;
use quorum_sync::infrastructure::gateway::{LedgerGateway, MockContract};
use std::sync::Arc;

#[tokio::test]
async fn reverted_execution_surfaces_as_failed_status() {
    let wallet = addr(0xee);
    let contract = MockContract::new(wallet, vec![addr(1), addr(2)], 2);
    contract.fail_execution_to(addr(9));

    let observer = Arc::new(RecordingObserver::new());
    let session = SyncSession::start(
        test_pair(wallet, addr(1)),
        &test_runtime(),
        Arc::new(contract.connect(addr(1))),
        observer,
    );
    assert!(wait_until(|| session.sync_state() == SyncState::Synced, 2_000).await);

    let id = session.executor().submit_transaction(addr(9), 1, vec![]).await.unwrap();
    let second_owner = contract.connect(addr(2));
    second_owner.confirm_transaction(id).await.unwrap();

    let store = Arc::clone(session.transactions());
    assert!(
        wait_until(
            || store.get(id).unwrap().map(|tx| tx.status() == TxStatus::Failed).unwrap_or(false),
            2_000,
        )
        .await
    );

    let tx = store.get(id).unwrap().unwrap();
    assert!(!tx.executed);
    assert_eq!(tx.confirmations.len(), 2);
    // Quorum was reached remotely even though execution reverted.
    assert!(tx.remote_confirmed);

    session.shutdown().await.unwrap();
}
