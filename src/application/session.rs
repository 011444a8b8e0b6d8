use crate::application::executor::IntentExecutor;
use crate::application::observer::{SessionObserver, SyncState};
use crate::application::reconciler::ReconciliationEngine;
use crate::foundation::{Result, SyncError};
use crate::infrastructure::config::{RuntimeConfig, SessionPair};
use crate::infrastructure::gateway::LedgerGateway;
use crate::infrastructure::store::{OwnerRegistry, TransactionStore};
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Composition root for one (chain, wallet address, account) pair.
///
/// Starting a session wires the caches, the reconciliation pump, and the
/// intent executor; shutting it down bumps the session epoch so late-arriving
/// fetch results are discarded, and tears the pump down. Switching pairs is
/// shutdown-then-start: transaction ids and owner sets are not comparable
/// across contract instances, so nothing carries over.
pub struct SyncSession {
    pair: SessionPair,
    store: Arc<TransactionStore>,
    owners: Arc<OwnerRegistry>,
    reconciler: Arc<ReconciliationEngine>,
    executor: Arc<IntentExecutor>,
    epoch: Arc<AtomicU64>,
    session_epoch: u64,
    shutdown: watch::Sender<bool>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl SyncSession {
    pub fn start(
        pair: SessionPair,
        runtime: &RuntimeConfig,
        gateway: Arc<dyn LedgerGateway>,
        observer: Arc<dyn SessionObserver>,
    ) -> Arc<Self> {
        info!(
            "starting sync session chain_id={} wallet={} account={}",
            pair.chain, pair.wallet, pair.account
        );
        let epoch = Arc::new(AtomicU64::new(1));
        let session_epoch = 1;
        let store = Arc::new(TransactionStore::new());
        let owners = Arc::new(OwnerRegistry::new(pair.account));
        let reconciler = Arc::new(ReconciliationEngine::new(
            Arc::clone(&gateway),
            Arc::clone(&store),
            Arc::clone(&owners),
            observer,
            Arc::clone(&epoch),
            session_epoch,
            runtime.call_timeout_ms,
            runtime.resubscribe_interval_ms,
        ));
        let executor = Arc::new(IntentExecutor::new(
            gateway,
            Arc::clone(&store),
            Arc::clone(&owners),
            Arc::clone(&reconciler),
            pair.wallet,
            pair.account,
            runtime.call_timeout_ms,
            Arc::clone(&epoch),
            session_epoch,
        ));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let pump = tokio::spawn(Arc::clone(&reconciler).run(shutdown_rx));
        Arc::new(Self {
            pair,
            store,
            owners,
            reconciler,
            executor,
            epoch,
            session_epoch,
            shutdown,
            pump: Mutex::new(Some(pump)),
        })
    }

    pub fn pair(&self) -> SessionPair {
        self.pair
    }

    /// Read view over the cached transactions.
    pub fn transactions(&self) -> &Arc<TransactionStore> {
        &self.store
    }

    /// Read view over the cached owner set and threshold.
    pub fn owners(&self) -> &Arc<OwnerRegistry> {
        &self.owners
    }

    pub fn executor(&self) -> &Arc<IntentExecutor> {
        &self.executor
    }

    pub fn reconciler(&self) -> &Arc<ReconciliationEngine> {
        &self.reconciler
    }

    pub fn sync_state(&self) -> SyncState {
        self.reconciler.state()
    }

    pub fn is_active(&self) -> bool {
        self.epoch.load(Ordering::Acquire) == self.session_epoch
    }

    /// Tear the session down: discard late results, stop the pump.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        info!("shutting down sync session chain_id={} wallet={}", self.pair.chain, self.pair.wallet);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let _ = self.shutdown.send(true);
        let handle = {
            let mut guard = self.pump.lock().map_err(|_| SyncError::StoreLock { operation: "session pump" })?;
            guard.take()
        };
        if let Some(handle) = handle {
            // The pump only awaits gateway calls and the shutdown signal;
            // store critical sections are synchronous, so aborting here
            // cannot interrupt a cache mutation.
            handle.abort();
            let _ = handle.await;
        }
        Ok(())
    }

    /// Switch to a different (chain, wallet, account) pair: tear this session
    /// down completely, then start a fresh one with empty caches.
    pub async fn switch(
        &self,
        pair: SessionPair,
        runtime: &RuntimeConfig,
        gateway: Arc<dyn LedgerGateway>,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Arc<SyncSession>> {
        self.shutdown().await?;
        Ok(SyncSession::start(pair, runtime, gateway, observer))
    }
}
