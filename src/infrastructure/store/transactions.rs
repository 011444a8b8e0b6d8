use crate::domain::{ConfirmationSet, Transaction, TxOrigin, TxSnapshot};
use crate::foundation::{Address, SyncError, TxId};
use crate::foundation::Result;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory authoritative cache of known transactions, keyed and ordered by
/// contract-issued id.
///
/// Every mutation is a short critical section over its own read-modify-write;
/// no lock is ever held across an await. Terminal-state protection: once a
/// stored entry is `executed`, later upserts can only union in
/// late-discovered confirmations, never change anything else.
pub struct TransactionStore {
    inner: Mutex<BTreeMap<TxId, Transaction>>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(BTreeMap::new()) }
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, BTreeMap<TxId, Transaction>>> {
        self.inner.lock().map_err(|_| SyncError::StoreLock { operation: "transaction store" })
    }

    /// Merge an authoritative per-id fetch into the cache.
    ///
    /// A non-executed entry is overwritten by the snapshot (an optimistic
    /// entry is replaced wholesale, never merged). An executed entry only
    /// unions in confirmations the snapshot knows about.
    pub fn upsert_snapshot(&self, snapshot: TxSnapshot) -> Result<Transaction> {
        let mut inner = self.lock_inner()?;
        let incoming_confirmations = ConfirmationSet::from_iter(snapshot.confirmations.iter().copied());
        let entry = inner.entry(snapshot.id).or_insert_with(|| Transaction {
            id: snapshot.id,
            destination: snapshot.record.destination,
            value: snapshot.record.value,
            payload: snapshot.record.data.clone(),
            confirmations: ConfirmationSet::new(),
            executed: false,
            failure_observed: false,
            remote_confirmed: false,
            origin: TxOrigin::Authoritative,
        });
        if entry.executed {
            entry.confirmations.merge(&incoming_confirmations);
            entry.remote_confirmed |= snapshot.remote_confirmed;
            return Ok(entry.clone());
        }
        entry.destination = snapshot.record.destination;
        entry.value = snapshot.record.value;
        entry.payload = snapshot.record.data;
        entry.confirmations = incoming_confirmations;
        entry.executed = snapshot.record.executed;
        entry.remote_confirmed = snapshot.remote_confirmed;
        entry.origin = TxOrigin::Authoritative;
        Ok(entry.clone())
    }

    /// Reflect a locally acknowledged submit before its authoritative read
    /// lands. Never clobbers an existing entry.
    pub fn insert_optimistic(
        &self,
        id: TxId,
        destination: Address,
        value: u128,
        payload: Vec<u8>,
        submitter: Address,
    ) -> Result<bool> {
        let mut inner = self.lock_inner()?;
        if inner.contains_key(&id) {
            return Ok(false);
        }
        inner.insert(
            id,
            Transaction {
                id,
                destination,
                value,
                payload,
                confirmations: ConfirmationSet::from_iter([submitter]),
                executed: false,
                failure_observed: false,
                remote_confirmed: false,
                origin: TxOrigin::Optimistic,
            },
        );
        Ok(true)
    }

    /// Idempotent confirmation add. No-op once the transaction is executed
    /// or when the id is unknown. Returns whether anything changed.
    pub fn apply_confirmation(&self, id: TxId, owner: Address) -> Result<bool> {
        let mut inner = self.lock_inner()?;
        match inner.get_mut(&id) {
            Some(entry) if !entry.executed => Ok(entry.confirmations.add(owner)),
            _ => Ok(false),
        }
    }

    /// Idempotent confirmation removal, same rules as `apply_confirmation`.
    pub fn apply_revocation(&self, id: TxId, owner: Address) -> Result<bool> {
        let mut inner = self.lock_inner()?;
        match inner.get_mut(&id) {
            Some(entry) if !entry.executed => Ok(entry.confirmations.remove(&owner)),
            _ => Ok(false),
        }
    }

    /// Replace the confirmation list from a targeted re-fetch.
    pub fn apply_confirmation_snapshot(&self, id: TxId, confirmations: Vec<Address>, remote_confirmed: bool) -> Result<bool> {
        let mut inner = self.lock_inner()?;
        let Some(entry) = inner.get_mut(&id) else {
            return Ok(false);
        };
        let incoming = ConfirmationSet::from_iter(confirmations);
        if entry.executed {
            let added = entry.confirmations.merge(&incoming) > 0;
            entry.remote_confirmed |= remote_confirmed;
            return Ok(added);
        }
        let changed = entry.confirmations != incoming || entry.remote_confirmed != remote_confirmed;
        entry.confirmations = incoming;
        entry.remote_confirmed = remote_confirmed;
        Ok(changed)
    }

    /// Record an observed `ExecutionFailure` for the id.
    pub fn mark_failure_observed(&self, id: TxId) -> Result<bool> {
        let mut inner = self.lock_inner()?;
        match inner.get_mut(&id) {
            Some(entry) if !entry.executed && !entry.failure_observed => {
                entry.failure_observed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn get(&self, id: TxId) -> Result<Option<Transaction>> {
        Ok(self.lock_inner()?.get(&id).cloned())
    }

    /// All known transactions, ordered by id.
    pub fn list(&self) -> Result<Vec<Transaction>> {
        Ok(self.lock_inner()?.values().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock_inner()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock_inner()?.is_empty())
    }
}

impl Default for TransactionStore {
    fn default() -> Self {
        Self::new()
    }
}
