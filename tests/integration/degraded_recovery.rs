//! Subscription loss: the engine degrades without dropping cached state, and
//! recovery re-baselines instead of trusting anything buffered, so changes
//! made during the outage converge anyway.

use crate::fixtures::{addr, test_pair, test_runtime, wait_until, RecordingObserver};
use quorum_sync::application::{SyncSession, SyncState};
use quorum_sync::domain::TxStatus;
use quorum_sync::infrastructure::gateway::{LedgerGateway, MockContract};
use std::sync::Arc;

#[tokio::test]
async fn missed_events_converge_through_baseline_refetch() {
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

    let id = session.executor().submit_transaction(addr(9), 3, vec![]).await.unwrap();
    let store = Arc::clone(session.transactions());
    assert!(wait_until(|| store.get(id).unwrap().is_some(), 2_000).await);

    // Network drop: every live subscription ends.
    contract.drop_subscribers();
    assert!(wait_until(|| session.sync_state() == SyncState::Degraded, 2_000).await);

    // Cached state is retained while degraded.
    assert_eq!(store.get(id).unwrap().unwrap().status(), TxStatus::Pending);

    // The second owner reaches quorum while we cannot see events.
    let second_owner = contract.connect(addr(2));
    second_owner.confirm_transaction(id).await.unwrap();

    // Recovery resubscribes and re-runs the baseline; the store converges
    // straight to executed despite the missed intermediate events.
    assert!(
        wait_until(
            || {
                session.sync_state() == SyncState::Synced
                    && store
                        .get(id)
                        .unwrap()
                        .map(|tx| tx.status() == TxStatus::Executed && tx.confirmations.len() == 2)
                        .unwrap_or(false)
            },
            3_000,
        )
        .await
    );
    assert!(observer.saw_degraded());
    assert!(observer.saw_state(SyncState::Degraded));

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn first_load_failure_signals_sync_failed() {
    let wallet = addr(0xee);
    let contract = MockContract::new(wallet, vec![addr(1), addr(2)], 2);
    contract.set_reads_failing(true);

    let observer = Arc::new(RecordingObserver::new());
    let session = SyncSession::start(
        test_pair(wallet, addr(1)),
        &test_runtime(),
        Arc::new(contract.connect(addr(1))),
        observer.clone(),
    );

    // No prior value exists, so the failure is fatal rather than degraded.
    assert!(wait_until(|| observer.saw_failed(), 2_000).await);

    // Once the network recovers the retry loop brings the session up.
    contract.set_reads_failing(false);
    assert!(wait_until(|| session.sync_state() == SyncState::Synced, 3_000).await);

    session.shutdown().await.unwrap();
}
