use crate::domain::TxRecord;
use crate::foundation::{Address, SyncError, TxId};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::future::Future;
use std::time::Duration;

pub mod mock;

pub use mock::{MockContract, MockLedgerGateway};

pub type Result<T> = std::result::Result<T, SyncError>;

/// Domain events emitted by the multisig contract.
///
/// Submission/Confirmation/Revocation/Execution/ExecutionFailure carry the
/// transaction id they concern, so the engine can re-fetch exactly the
/// affected entity instead of re-scanning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    Submission { id: TxId },
    Confirmation { owner: Address, id: TxId },
    Revocation { owner: Address, id: TxId },
    Execution { id: TxId },
    ExecutionFailure { id: TxId },
    OwnerAddition { owner: Address },
    OwnerRemoval { owner: Address },
    RequirementChange { required: u32 },
}

pub struct EventSubscription {
    inner: BoxStream<'static, Result<WalletEvent>>,
}

impl EventSubscription {
    pub fn new(inner: BoxStream<'static, Result<WalletEvent>>) -> Self {
        Self { inner }
    }

    pub async fn next(&mut self) -> Option<Result<WalletEvent>> {
        self.inner.next().await
    }
}

/// The boundary to the remote ledger and multisig contract.
///
/// Read calls return the contract's current stored state; write calls return
/// only after remote finality. The engine never retries a write on its own
/// (a retried state-mutating call risks double submission).
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn get_owners(&self) -> Result<Vec<Address>>;
    async fn required(&self) -> Result<u32>;
    async fn transaction_count(&self) -> Result<u64>;
    async fn transaction(&self, id: TxId) -> Result<TxRecord>;
    async fn get_confirmations(&self, id: TxId) -> Result<Vec<Address>>;
    async fn is_confirmed(&self, id: TxId) -> Result<bool>;

    async fn submit_transaction(&self, destination: Address, value: u128, data: Vec<u8>) -> Result<TxId>;
    async fn confirm_transaction(&self, id: TxId) -> Result<()>;
    async fn revoke_confirmation(&self, id: TxId) -> Result<()>;

    async fn subscribe(&self) -> Result<EventSubscription>;
}

/// Bound a gateway call so a dead network surfaces as `CallTimeout` instead
/// of an indefinite stall.
pub async fn with_call_timeout<T, F>(operation: &str, timeout_ms: u64, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::CallTimeout { operation: operation.to_string(), timeout_ms }),
    }
}
