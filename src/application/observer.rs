use crate::domain::{OwnerSnapshot, Transaction};
use crate::foundation::SyncError;
use log::{debug, info, warn};
use std::sync::Arc;

/// Subscription lifecycle of a session's reconciliation engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Unsubscribed,
    Subscribing,
    Synced,
    Degraded,
}

/// Receives session state changes.
///
/// Degraded is a non-fatal staleness signal (prior cached state remains
/// usable); failed means no usable cached state exists.
pub trait SessionObserver: Send + Sync {
    fn on_sync_state_changed(&self, _old: SyncState, _new: SyncState) {}
    fn on_transaction_updated(&self, _tx: &Transaction) {}
    fn on_owners_changed(&self, _snapshot: &OwnerSnapshot) {}
    fn on_sync_degraded(&self, _reason: &SyncError) {}
    fn on_sync_failed(&self, _reason: &SyncError) {}
}

pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

pub struct CompositeObserver {
    observers: Vec<Arc<dyn SessionObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self { observers: Vec::new() }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }
}

impl Default for CompositeObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionObserver for CompositeObserver {
    fn on_sync_state_changed(&self, old: SyncState, new: SyncState) {
        info!("sync state changed old_state={:?} new_state={:?}", old, new);
        for observer in &self.observers {
            observer.on_sync_state_changed(old, new);
        }
    }

    fn on_transaction_updated(&self, tx: &Transaction) {
        debug!(
            "transaction updated id={} status={:?} confirmation_count={}",
            tx.id,
            tx.status(),
            tx.confirmations.len()
        );
        for observer in &self.observers {
            observer.on_transaction_updated(tx);
        }
    }

    fn on_owners_changed(&self, snapshot: &OwnerSnapshot) {
        info!(
            "owner set changed owner_count={} threshold={} account_is_owner={}",
            snapshot.owners.len(),
            snapshot.threshold,
            snapshot.account_is_owner
        );
        for observer in &self.observers {
            observer.on_owners_changed(snapshot);
        }
    }

    fn on_sync_degraded(&self, reason: &SyncError) {
        warn!("sync degraded reason={}", reason);
        for observer in &self.observers {
            observer.on_sync_degraded(reason);
        }
    }

    fn on_sync_failed(&self, reason: &SyncError) {
        warn!("sync failed reason={}", reason);
        for observer in &self.observers {
            observer.on_sync_failed(reason);
        }
    }
}
