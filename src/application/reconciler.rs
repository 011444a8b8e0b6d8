use crate::application::observer::{SessionObserver, SyncState};
use crate::domain::TxSnapshot;
use crate::foundation::{Result, SyncError, TxId};
use crate::infrastructure::gateway::{with_call_timeout, LedgerGateway, WalletEvent};
use crate::infrastructure::store::{OwnerRegistry, TransactionStore};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Consumes remote change notifications and keeps the local caches coherent.
///
/// Per subscription the engine moves through
/// `Unsubscribed -> Subscribing -> Synced -> Degraded` and back. Entering
/// `Synced` performs one baseline fetch; afterwards each event triggers a
/// targeted re-fetch of only the affected entity, bounding remote call volume
/// to O(events). Events missed while degraded cannot be assumed complete, so
/// recovery always re-runs the baseline instead of trusting buffered data.
pub struct ReconciliationEngine {
    gateway: Arc<dyn LedgerGateway>,
    store: Arc<TransactionStore>,
    owners: Arc<OwnerRegistry>,
    observer: Arc<dyn SessionObserver>,
    state: Mutex<SyncState>,
    session_epoch: Arc<AtomicU64>,
    engine_epoch: u64,
    call_timeout_ms: u64,
    resubscribe_interval_ms: u64,
}

impl ReconciliationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        store: Arc<TransactionStore>,
        owners: Arc<OwnerRegistry>,
        observer: Arc<dyn SessionObserver>,
        session_epoch: Arc<AtomicU64>,
        engine_epoch: u64,
        call_timeout_ms: u64,
        resubscribe_interval_ms: u64,
    ) -> Self {
        Self {
            gateway,
            store,
            owners,
            observer,
            state: Mutex::new(SyncState::Unsubscribed),
            session_epoch,
            engine_epoch,
            call_timeout_ms,
            resubscribe_interval_ms,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state.lock().map(|guard| *guard).unwrap_or(SyncState::Degraded)
    }

    fn set_state(&self, new: SyncState) {
        let old = match self.state.lock() {
            Ok(mut guard) => {
                let old = *guard;
                if old == new {
                    return;
                }
                *guard = new;
                old
            }
            Err(_) => return,
        };
        info!("reconciliation state transition old_state={:?} new_state={:?}", old, new);
        self.observer.on_sync_state_changed(old, new);
    }

    /// Results arriving after the session was torn down must be discarded.
    fn session_live(&self) -> bool {
        self.session_epoch.load(Ordering::Acquire) == self.engine_epoch
    }

    /// Degraded when prior cached state remains usable, failed when none
    /// exists (first load never succeeded).
    fn signal_sync_problem(&self, reason: &SyncError) {
        let has_prior = self.owners.has_value().unwrap_or(false);
        if has_prior {
            self.observer.on_sync_degraded(reason);
        } else {
            self.observer.on_sync_failed(reason);
        }
    }

    async fn fetch_snapshot(&self, id: TxId) -> Result<TxSnapshot> {
        let record = with_call_timeout("transaction", self.call_timeout_ms, self.gateway.transaction(id)).await?;
        let confirmations =
            with_call_timeout("get_confirmations", self.call_timeout_ms, self.gateway.get_confirmations(id)).await?;
        let remote_confirmed = with_call_timeout("is_confirmed", self.call_timeout_ms, self.gateway.is_confirmed(id)).await?;
        Ok(TxSnapshot { id, record, confirmations, remote_confirmed })
    }

    /// Targeted re-fetch of one transaction's tuple.
    pub async fn refresh_transaction(&self, id: TxId) -> Result<()> {
        let snapshot = self.fetch_snapshot(id).await?;
        if !self.session_live() {
            debug!("discarding stale fetch result id={} engine_epoch={}", id, self.engine_epoch);
            return Ok(());
        }
        let tx = self.store.upsert_snapshot(snapshot)?;
        self.observer.on_transaction_updated(&tx);
        Ok(())
    }

    /// Targeted re-fetch of one transaction's confirmation state.
    async fn refresh_confirmations(&self, id: TxId) -> Result<()> {
        let confirmations =
            with_call_timeout("get_confirmations", self.call_timeout_ms, self.gateway.get_confirmations(id)).await?;
        let remote_confirmed = with_call_timeout("is_confirmed", self.call_timeout_ms, self.gateway.is_confirmed(id)).await?;
        if !self.session_live() {
            debug!("discarding stale confirmation fetch id={} engine_epoch={}", id, self.engine_epoch);
            return Ok(());
        }
        self.store.apply_confirmation_snapshot(id, confirmations, remote_confirmed)?;
        if let Some(tx) = self.store.get(id)? {
            self.observer.on_transaction_updated(&tx);
        }
        Ok(())
    }

    /// Coalesced owner set + threshold refresh.
    pub async fn refresh_owners(&self) -> Result<()> {
        match self.owners.refresh(self.gateway.as_ref(), self.call_timeout_ms).await {
            Ok((snapshot, changed)) => {
                if !self.session_live() {
                    return Ok(());
                }
                if changed {
                    self.observer.on_owners_changed(&snapshot);
                }
                Ok(())
            }
            Err(err) => {
                self.signal_sync_problem(&err);
                Err(err)
            }
        }
    }

    /// Full re-read of all relevant remote state: owners, threshold, and
    /// every transaction id's tuple. Per-id failures are isolated so one
    /// broken id never blocks reconciliation of the others.
    pub async fn baseline(&self) -> Result<()> {
        self.refresh_owners().await?;
        let count = match with_call_timeout("transaction_count", self.call_timeout_ms, self.gateway.transaction_count()).await
        {
            Ok(count) => count,
            Err(err) => {
                self.signal_sync_problem(&err);
                return Err(err);
            }
        };
        debug!("baseline fetch starting transaction_count={}", count);
        for raw_id in 0..count {
            let id = TxId::new(raw_id);
            if let Err(err) = self.refresh_transaction(id).await {
                warn!("baseline fetch failed for transaction id={} error={}", id, err);
            }
        }
        info!("baseline fetch complete transaction_count={}", count);
        Ok(())
    }

    /// Apply one remote event: the idempotent local mutation plus the
    /// targeted re-fetch of the affected entity.
    pub async fn handle_event(&self, event: WalletEvent) -> Result<()> {
        debug!("handling wallet event event={:?}", event);
        match event {
            WalletEvent::Submission { id } => self.refresh_transaction(id).await,
            WalletEvent::Confirmation { owner, id } => {
                if self.store.get(id)?.is_none() {
                    return self.refresh_transaction(id).await;
                }
                self.store.apply_confirmation(id, owner)?;
                self.refresh_confirmations(id).await
            }
            WalletEvent::Revocation { owner, id } => {
                if self.store.get(id)?.is_none() {
                    return self.refresh_transaction(id).await;
                }
                self.store.apply_revocation(id, owner)?;
                self.refresh_confirmations(id).await
            }
            WalletEvent::Execution { id } => self.refresh_transaction(id).await,
            WalletEvent::ExecutionFailure { id } => {
                self.store.mark_failure_observed(id)?;
                self.refresh_transaction(id).await?;
                // The entry may only have been created by the re-fetch.
                if self.store.mark_failure_observed(id)? {
                    if let Some(tx) = self.store.get(id)? {
                        self.observer.on_transaction_updated(&tx);
                    }
                }
                Ok(())
            }
            WalletEvent::OwnerAddition { .. } | WalletEvent::OwnerRemoval { .. } | WalletEvent::RequirementChange { .. } => {
                self.refresh_owners().await
            }
        }
    }

    /// Subscription pump. Subscribes, baselines, then applies events in
    /// delivery order until the stream drops; while degraded it retries on
    /// the configured interval, re-baselining on every recovery.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.set_state(SyncState::Subscribing);
            let mut subscription = match self.gateway.subscribe().await {
                Ok(subscription) => subscription,
                Err(err) => {
                    warn!("subscription attempt failed error={}", err);
                    self.signal_sync_problem(&err);
                    self.set_state(SyncState::Degraded);
                    if !self.sleep_or_shutdown(&mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };
            if let Err(err) = self.baseline().await {
                warn!("baseline fetch failed error={}", err);
                self.set_state(SyncState::Degraded);
                if !self.sleep_or_shutdown(&mut shutdown).await {
                    break;
                }
                continue;
            }
            self.set_state(SyncState::Synced);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        self.set_state(SyncState::Unsubscribed);
                        return;
                    }
                    item = subscription.next() => match item {
                        Some(Ok(event)) => {
                            if let Err(err) = self.handle_event(event.clone()).await {
                                // Isolation per id: one failed reconciliation
                                // never blocks the pump.
                                warn!("event reconciliation failed event={:?} error={}", event, err);
                                self.observer.on_sync_degraded(&err);
                            }
                        }
                        Some(Err(err)) => {
                            self.observer.on_sync_degraded(&err);
                            self.set_state(SyncState::Degraded);
                            break;
                        }
                        None => {
                            let err = SyncError::SubscriptionLost("event stream ended".to_string());
                            self.observer.on_sync_degraded(&err);
                            self.set_state(SyncState::Degraded);
                            break;
                        }
                    }
                }
            }

            if !self.sleep_or_shutdown(&mut shutdown).await {
                break;
            }
        }
        self.set_state(SyncState::Unsubscribed);
    }

    /// Returns false when shutdown was requested during the wait.
    async fn sleep_or_shutdown(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        if *shutdown.borrow() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(self.resubscribe_interval_ms)) => true,
            _ = shutdown.changed() => false,
        }
    }
}
