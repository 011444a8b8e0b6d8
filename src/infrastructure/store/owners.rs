use crate::domain::OwnerSnapshot;
use crate::foundation::{Address, Result, SyncError};
use crate::infrastructure::gateway::{with_call_timeout, LedgerGateway};
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// In-memory cache of the current owner set and approval threshold.
///
/// Refreshes are coalesced: concurrent callers share one in-flight remote
/// read instead of issuing duplicates (a burst of owner events would
/// otherwise turn into a request storm). On refresh failure the prior
/// snapshot is retained and marked stale, never cleared.
pub struct OwnerRegistry {
    account: Address,
    snapshot: Mutex<Option<OwnerSnapshot>>,
    refresh_epoch: AtomicU64,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl OwnerRegistry {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            snapshot: Mutex::new(None),
            refresh_epoch: AtomicU64::new(0),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn lock_snapshot(&self) -> Result<MutexGuard<'_, Option<OwnerSnapshot>>> {
        self.snapshot.lock().map_err(|_| SyncError::StoreLock { operation: "owner registry" })
    }

    /// The last published snapshot, if any refresh has ever succeeded.
    pub fn current(&self) -> Result<Option<OwnerSnapshot>> {
        Ok(self.lock_snapshot()?.clone())
    }

    pub fn has_value(&self) -> Result<bool> {
        Ok(self.lock_snapshot()?.is_some())
    }

    fn mark_stale(&self) -> Result<()> {
        if let Some(snapshot) = self.lock_snapshot()?.as_mut() {
            snapshot.stale = true;
        }
        Ok(())
    }

    /// Re-read owners and threshold from the gateway.
    ///
    /// Returns the fresh snapshot and whether it differs from the previous
    /// one. Callers that arrive while another refresh is in flight await it
    /// and reuse its result.
    pub async fn refresh(&self, gateway: &dyn LedgerGateway, call_timeout_ms: u64) -> Result<(OwnerSnapshot, bool)> {
        let epoch_at_entry = self.refresh_epoch.load(Ordering::Acquire);
        let _flight = self.refresh_lock.lock().await;
        if self.refresh_epoch.load(Ordering::Acquire) != epoch_at_entry {
            // A refresh completed while we waited; reuse its result.
            if let Some(snapshot) = self.current()? {
                debug!("owner refresh coalesced epoch={}", self.refresh_epoch.load(Ordering::Acquire));
                return Ok((snapshot, false));
            }
        }

        let owners = match with_call_timeout("get_owners", call_timeout_ms, gateway.get_owners()).await {
            Ok(owners) => owners,
            Err(err) => {
                self.mark_stale()?;
                return Err(err);
            }
        };
        let threshold = match with_call_timeout("required", call_timeout_ms, gateway.required()).await {
            Ok(threshold) => threshold,
            Err(err) => {
                self.mark_stale()?;
                return Err(err);
            }
        };

        let fresh = OwnerSnapshot {
            account_is_owner: owners.contains(&self.account),
            owners,
            threshold,
            stale: false,
        };
        if !fresh.threshold_invariant_holds() {
            // The remote contract enforces the invariant, so a local reading
            // that violates it is a stale or torn read and must not be trusted.
            warn!(
                "owner refresh rejected: threshold invariant violated threshold={} owner_count={}",
                fresh.threshold,
                fresh.owners.len()
            );
            self.mark_stale()?;
            return Err(SyncError::remote_call("owner_refresh", "threshold invariant violated, stale read"));
        }

        let changed = {
            let mut guard = self.lock_snapshot()?;
            let changed = guard.as_ref() != Some(&fresh);
            *guard = Some(fresh.clone());
            changed
        };
        self.refresh_epoch.fetch_add(1, Ordering::AcqRel);
        debug!(
            "owner registry refreshed owner_count={} threshold={} changed={}",
            fresh.owners.len(),
            fresh.threshold,
            changed
        );
        Ok((fresh, changed))
    }
}
