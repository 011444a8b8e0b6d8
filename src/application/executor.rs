use crate::application::reconciler::ReconciliationEngine;
use crate::domain::{calldata, OwnerSnapshot};
use crate::foundation::{Address, Result, SyncError, TxId};
use crate::infrastructure::gateway::{with_call_timeout, LedgerGateway};
use crate::infrastructure::store::{OwnerRegistry, TransactionStore};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Issues mutating operations against the multisig contract.
///
/// All operations are single-shot: a failed write is surfaced to the caller
/// and never retried automatically (a retried state-mutating call risks
/// double submission). Owner and threshold changes are meta-operations: the
/// management call is encoded as the payload of an ordinary submission
/// against the wallet's own address, so it passes through the same approval
/// pipeline as any other transaction.
pub struct IntentExecutor {
    gateway: Arc<dyn LedgerGateway>,
    store: Arc<TransactionStore>,
    owners: Arc<OwnerRegistry>,
    reconciler: Arc<ReconciliationEngine>,
    wallet: Address,
    account: Address,
    call_timeout_ms: u64,
    session_epoch: Arc<AtomicU64>,
    executor_epoch: u64,
}

impl IntentExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        store: Arc<TransactionStore>,
        owners: Arc<OwnerRegistry>,
        reconciler: Arc<ReconciliationEngine>,
        wallet: Address,
        account: Address,
        call_timeout_ms: u64,
        session_epoch: Arc<AtomicU64>,
        executor_epoch: u64,
    ) -> Self {
        Self { gateway, store, owners, reconciler, wallet, account, call_timeout_ms, session_epoch, executor_epoch }
    }

    fn session_live(&self) -> bool {
        self.session_epoch.load(Ordering::Acquire) == self.executor_epoch
    }

    fn owner_snapshot(&self) -> Result<OwnerSnapshot> {
        self.owners
            .current()?
            .ok_or_else(|| SyncError::SyncFailed("owner set not loaded yet".to_string()))
    }

    /// The event stream is not assumed to deliver promptly: once our own
    /// call is acknowledged we refresh the affected entity proactively.
    async fn post_ack_refresh(&self, id: TxId) {
        if let Err(err) = self.reconciler.refresh_transaction(id).await {
            warn!("post-ack refresh failed id={} error={}", id, err);
        }
    }

    pub async fn submit_transaction(&self, destination: Address, value: u128, payload: Vec<u8>) -> Result<TxId> {
        let id = with_call_timeout(
            "submit_transaction",
            self.call_timeout_ms,
            self.gateway.submit_transaction(destination, value, payload.clone()),
        )
        .await?;
        info!("transaction submitted id={} destination={} value={}", id, destination, value);
        if !self.session_live() {
            debug!("submit result dropped, session closed id={}", id);
            return Ok(id);
        }
        // The contract auto-confirms the submitter; reflect that optimistically
        // until the authoritative read replaces the entry.
        self.store.insert_optimistic(id, destination, value, payload, self.account)?;
        self.post_ack_refresh(id).await;
        Ok(id)
    }

    pub async fn confirm_transaction(&self, id: TxId) -> Result<()> {
        if self.store.get(id)?.is_none() {
            return Err(SyncError::UnknownTransaction(id.value()));
        }
        with_call_timeout("confirm_transaction", self.call_timeout_ms, self.gateway.confirm_transaction(id)).await?;
        info!("confirmation submitted id={} owner={}", id, self.account);
        if !self.session_live() {
            debug!("confirm result dropped, session closed id={}", id);
            return Ok(());
        }
        self.store.apply_confirmation(id, self.account)?;
        self.post_ack_refresh(id).await;
        Ok(())
    }

    pub async fn revoke_confirmation(&self, id: TxId) -> Result<()> {
        if self.store.get(id)?.is_none() {
            return Err(SyncError::UnknownTransaction(id.value()));
        }
        with_call_timeout("revoke_confirmation", self.call_timeout_ms, self.gateway.revoke_confirmation(id)).await?;
        info!("confirmation revoked id={} owner={}", id, self.account);
        if !self.session_live() {
            debug!("revoke result dropped, session closed id={}", id);
            return Ok(());
        }
        self.store.apply_revocation(id, self.account)?;
        self.post_ack_refresh(id).await;
        Ok(())
    }

    pub async fn add_owner(&self, owner: Address) -> Result<TxId> {
        let snapshot = self.owner_snapshot()?;
        if snapshot.is_owner(&owner) {
            return Err(SyncError::DuplicateOwner(owner.to_string()));
        }
        info!("submitting wrapped add_owner owner={}", owner);
        self.submit_transaction(self.wallet, 0, calldata::add_owner(&owner)).await
    }

    pub async fn remove_owner(&self, owner: Address) -> Result<TxId> {
        let snapshot = self.owner_snapshot()?;
        if !snapshot.is_owner(&owner) {
            return Err(SyncError::OwnerNotFound(owner.to_string()));
        }
        info!("submitting wrapped remove_owner owner={}", owner);
        self.submit_transaction(self.wallet, 0, calldata::remove_owner(&owner)).await
    }

    pub async fn replace_owner(&self, owner: Address, new_owner: Address) -> Result<TxId> {
        let snapshot = self.owner_snapshot()?;
        if !snapshot.is_owner(&owner) {
            return Err(SyncError::OwnerNotFound(owner.to_string()));
        }
        if snapshot.is_owner(&new_owner) {
            return Err(SyncError::DuplicateOwner(new_owner.to_string()));
        }
        info!("submitting wrapped replace_owner owner={} new_owner={}", owner, new_owner);
        self.submit_transaction(self.wallet, 0, calldata::replace_owner(&owner, &new_owner)).await
    }

    pub async fn change_requirement(&self, required: u32) -> Result<TxId> {
        let snapshot = self.owner_snapshot()?;
        if required == 0 || required as usize > snapshot.owners.len() {
            return Err(SyncError::RequirementOutOfRange { requested: required, owner_count: snapshot.owners.len() });
        }
        info!("submitting wrapped change_requirement required={}", required);
        self.submit_transaction(self.wallet, 0, calldata::change_requirement(required)).await
    }
}
