use crate::domain::ConfirmationSet;
use crate::foundation::{Address, TxId};
use serde::{Deserialize, Serialize};

/// Derived transaction status.
///
/// `Failed` is only distinguishable from `Pending` by an observed
/// `ExecutionFailure` event for the id; absent that event the status stays
/// `Pending` regardless of confirmation count.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Executed,
    Failed,
}

/// Where the locally cached entry came from.
///
/// An `Optimistic` entry reflects a locally acknowledged intent before the
/// authoritative read landed. It is replaced wholesale (never merged into) by
/// the next authoritative snapshot, so it can never be mistaken for confirmed
/// state.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxOrigin {
    Optimistic,
    #[default]
    Authoritative,
}

/// The remote contract's stored tuple for one transaction id, as returned by
/// the gateway's `transaction(id)` read.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TxRecord {
    pub destination: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub executed: bool,
}

/// One authoritative per-id fetch: the record plus its confirmation state.
#[derive(Clone, Debug)]
pub struct TxSnapshot {
    pub id: TxId,
    pub record: TxRecord,
    pub confirmations: Vec<Address>,
    pub remote_confirmed: bool,
}

/// A locally cached multisig transaction.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: TxId,
    pub destination: Address,
    pub value: u128,
    pub payload: Vec<u8>,
    pub confirmations: ConfirmationSet,
    /// Terminal once true; confirmations are immutable from then on.
    pub executed: bool,
    /// Set when an `ExecutionFailure` event for this id has been observed.
    pub failure_observed: bool,
    /// The gateway's `is_confirmed(id)` read, cached for display. Not part of
    /// the `status()` derivation.
    pub remote_confirmed: bool,
    pub origin: TxOrigin,
}

impl Transaction {
    pub fn status(&self) -> TxStatus {
        if self.executed {
            TxStatus::Executed
        } else if self.failure_observed {
            TxStatus::Failed
        } else {
            TxStatus::Pending
        }
    }

    pub fn is_confirmed_by(&self, account: &Address) -> bool {
        self.confirmations.contains(account)
    }
}

/// Point-in-time view of the owner set and approval threshold.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct OwnerSnapshot {
    pub owners: Vec<Address>,
    pub threshold: u32,
    pub account_is_owner: bool,
    /// True when the last refresh failed and this snapshot predates it.
    pub stale: bool,
}

impl OwnerSnapshot {
    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }

    /// The remote contract enforces `1 <= threshold <= |owners|`; a local
    /// reading that violates it indicates a stale or torn read and must not
    /// be trusted.
    pub fn threshold_invariant_holds(&self) -> bool {
        self.threshold >= 1 && (self.threshold as usize) <= self.owners.len()
    }
}
