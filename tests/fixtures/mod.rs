//! Shared helpers for the unit and integration suites.

use quorum_sync::application::{SessionObserver, SyncState};
use quorum_sync::domain::{OwnerSnapshot, Transaction};
use quorum_sync::foundation::{Address, ChainId, SyncError};
use quorum_sync::infrastructure::config::{RuntimeConfig, SessionPair};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Deterministic test address: 19 zero bytes plus a tag byte.
pub fn addr(tag: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = tag;
    Address::new(bytes)
}

pub fn test_pair(wallet: Address, account: Address) -> SessionPair {
    SessionPair { chain: ChainId::new(5), wallet, account }
}

/// Runtime tuned for tests: short timeouts, fast resubscription.
pub fn test_runtime() -> RuntimeConfig {
    RuntimeConfig {
        call_timeout_ms: 1_000,
        resubscribe_interval_ms: 25,
        log_filters: "info".to_string(),
        log_dir: None,
    }
}

/// Observer that records everything it sees.
#[derive(Default)]
pub struct RecordingObserver {
    pub states: Mutex<Vec<SyncState>>,
    pub updated_ids: Mutex<Vec<u64>>,
    pub owner_changes: Mutex<Vec<OwnerSnapshot>>,
    pub degraded: AtomicBool,
    pub failed: AtomicBool,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saw_state(&self, state: SyncState) -> bool {
        self.states.lock().map(|states| states.contains(&state)).unwrap_or(false)
    }

    pub fn saw_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    pub fn saw_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }
}

impl SessionObserver for RecordingObserver {
    fn on_sync_state_changed(&self, _old: SyncState, new: SyncState) {
        if let Ok(mut states) = self.states.lock() {
            states.push(new);
        }
    }

    fn on_transaction_updated(&self, tx: &Transaction) {
        if let Ok(mut ids) = self.updated_ids.lock() {
            ids.push(tx.id.value());
        }
    }

    fn on_owners_changed(&self, snapshot: &OwnerSnapshot) {
        if let Ok(mut changes) = self.owner_changes.lock() {
            changes.push(snapshot.clone());
        }
    }

    fn on_sync_degraded(&self, _reason: &SyncError) {
        self.degraded.store(true, Ordering::Release);
    }

    fn on_sync_failed(&self, _reason: &SyncError) {
        self.failed.store(true, Ordering::Release);
    }
}

/// Poll `cond` until it holds or `timeout_ms` elapses.
pub async fn wait_until<F>(cond: F, timeout_ms: u64) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
