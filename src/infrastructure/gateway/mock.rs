//! In-memory contract simulation for tests and local runs.
//!
//! `MockContract` plays the remote multisig wallet: monotonic transaction
//! ids, confirmation bookkeeping, auto-execution at quorum, and execution of
//! wrapped owner-management calls submitted against the wallet's own address.
//! `MockLedgerGateway` is one signer's connection to it.

use crate::domain::{calldata, TxRecord};
use crate::foundation::{Address, SyncError, TxId};
use crate::infrastructure::gateway::{EventSubscription, LedgerGateway, Result, WalletEvent};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

struct MockTxEntry {
    destination: Address,
    value: u128,
    data: Vec<u8>,
    executed: bool,
    confirmations: Vec<Address>,
}

struct ContractState {
    owners: Vec<Address>,
    required: u32,
    transactions: Vec<MockTxEntry>,
    fail_destinations: HashSet<Address>,
    reads_failing: bool,
}

pub struct MockContract {
    address: Address,
    state: Mutex<ContractState>,
    events: Mutex<broadcast::Sender<WalletEvent>>,
}

impl MockContract {
    pub fn new(address: Address, owners: Vec<Address>, required: u32) -> Arc<Self> {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            address,
            state: Mutex::new(ContractState {
                owners,
                required,
                transactions: Vec::new(),
                fail_destinations: HashSet::new(),
                reads_failing: false,
            }),
            events: Mutex::new(sender),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn connect(self: &Arc<Self>, account: Address) -> MockLedgerGateway {
        MockLedgerGateway { contract: Arc::clone(self), account }
    }

    /// Inject an execution revert for every transaction targeting `destination`.
    pub fn fail_execution_to(&self, destination: Address) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_destinations.insert(destination);
        }
    }

    /// Toggle read-call failures to simulate a dead or flaky network.
    pub fn set_reads_failing(&self, failing: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.reads_failing = failing;
        }
    }

    /// Drop every live subscription, as a network-level disconnect would.
    /// Existing streams end; later `subscribe` calls attach to a new channel.
    pub fn drop_subscribers(&self) {
        if let Ok(mut events) = self.events.lock() {
            let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
            *events = sender;
        }
    }

    fn lock_state(&self, operation: &'static str) -> Result<MutexGuard<'_, ContractState>> {
        self.state.lock().map_err(|_| SyncError::StoreLock { operation })
    }

    fn emit(&self, event: WalletEvent) {
        if let Ok(events) = self.events.lock() {
            // Publishing with no subscribers is not an error for a contract.
            let _ = events.send(event);
        }
    }

    fn check_reads(state: &ContractState, operation: &str) -> Result<()> {
        if state.reads_failing {
            return Err(SyncError::remote_call(operation, "injected network error"));
        }
        Ok(())
    }

    fn require_owner(state: &ContractState, sender: &Address, operation: &str) -> Result<()> {
        if !state.owners.contains(sender) {
            return Err(SyncError::remote_call(operation, "sender is not an owner"));
        }
        Ok(())
    }

    fn submit(&self, sender: Address, destination: Address, value: u128, data: Vec<u8>) -> Result<TxId> {
        let id;
        {
            let mut state = self.lock_state("mock submit")?;
            Self::require_owner(&state, &sender, "submit_transaction")?;
            id = TxId::new(state.transactions.len() as u64);
            state.transactions.push(MockTxEntry { destination, value, data, executed: false, confirmations: Vec::new() });
        }
        self.emit(WalletEvent::Submission { id });
        // The contract auto-confirms the submitter.
        self.confirm(sender, id)?;
        Ok(id)
    }

    fn confirm(&self, sender: Address, id: TxId) -> Result<()> {
        {
            let mut state = self.lock_state("mock confirm")?;
            Self::require_owner(&state, &sender, "confirm_transaction")?;
            let entry = state
                .transactions
                .get_mut(id.value() as usize)
                .ok_or_else(|| SyncError::remote_call("confirm_transaction", "transaction does not exist"))?;
            if entry.executed {
                return Err(SyncError::remote_call("confirm_transaction", "transaction already executed"));
            }
            if entry.confirmations.contains(&sender) {
                return Err(SyncError::remote_call("confirm_transaction", "already confirmed by sender"));
            }
            entry.confirmations.push(sender);
        }
        self.emit(WalletEvent::Confirmation { owner: sender, id });
        self.try_execute(id)?;
        Ok(())
    }

    fn revoke(&self, sender: Address, id: TxId) -> Result<()> {
        {
            let mut state = self.lock_state("mock revoke")?;
            Self::require_owner(&state, &sender, "revoke_confirmation")?;
            let entry = state
                .transactions
                .get_mut(id.value() as usize)
                .ok_or_else(|| SyncError::remote_call("revoke_confirmation", "transaction does not exist"))?;
            if entry.executed {
                return Err(SyncError::remote_call("revoke_confirmation", "transaction already executed"));
            }
            if !entry.confirmations.contains(&sender) {
                return Err(SyncError::remote_call("revoke_confirmation", "not confirmed by sender"));
            }
            entry.confirmations.retain(|owner| owner != &sender);
        }
        self.emit(WalletEvent::Revocation { owner: sender, id });
        Ok(())
    }

    fn try_execute(&self, id: TxId) -> Result<()> {
        let mut follow_ups: Vec<WalletEvent> = Vec::new();
        {
            let mut state = self.lock_state("mock execute")?;
            let index = id.value() as usize;
            let (destination, data, quorum) = {
                let entry = match state.transactions.get(index) {
                    Some(entry) => entry,
                    None => return Ok(()),
                };
                if entry.executed {
                    return Ok(());
                }
                (entry.destination, entry.data.clone(), entry.confirmations.len() as u32 >= state.required)
            };
            if !quorum {
                return Ok(());
            }
            if state.fail_destinations.contains(&destination) {
                follow_ups.push(WalletEvent::ExecutionFailure { id });
            } else if destination == self.address {
                match Self::apply_self_call(&mut state, &data) {
                    Ok(mut emitted) => {
                        if let Some(entry) = state.transactions.get_mut(index) {
                            entry.executed = true;
                        }
                        follow_ups.append(&mut emitted);
                        follow_ups.push(WalletEvent::Execution { id });
                    }
                    // The wrapped management call reverted; the wrapper stays
                    // unexecuted, exactly like any other failed execution.
                    Err(_) => follow_ups.push(WalletEvent::ExecutionFailure { id }),
                }
            } else {
                if let Some(entry) = state.transactions.get_mut(index) {
                    entry.executed = true;
                }
                follow_ups.push(WalletEvent::Execution { id });
            }
        }
        for event in follow_ups {
            self.emit(event);
        }
        Ok(())
    }

    fn apply_self_call(state: &mut ContractState, data: &[u8]) -> std::result::Result<Vec<WalletEvent>, ()> {
        if data.len() < 4 {
            return Err(());
        }
        let mut events = Vec::new();
        let sel: [u8; 4] = [data[0], data[1], data[2], data[3]];
        if sel == calldata::selector("addOwner(address)") {
            let owner = word_address(data, 0).ok_or(())?;
            if state.owners.contains(&owner) {
                return Err(());
            }
            state.owners.push(owner);
            events.push(WalletEvent::OwnerAddition { owner });
        } else if sel == calldata::selector("removeOwner(address)") {
            let owner = word_address(data, 0).ok_or(())?;
            if !state.owners.contains(&owner) {
                return Err(());
            }
            state.owners.retain(|entry| entry != &owner);
            events.push(WalletEvent::OwnerRemoval { owner });
            if state.required > state.owners.len() as u32 {
                state.required = state.owners.len() as u32;
                events.push(WalletEvent::RequirementChange { required: state.required });
            }
        } else if sel == calldata::selector("replaceOwner(address,address)") {
            let owner = word_address(data, 0).ok_or(())?;
            let new_owner = word_address(data, 1).ok_or(())?;
            if !state.owners.contains(&owner) || state.owners.contains(&new_owner) {
                return Err(());
            }
            for entry in state.owners.iter_mut() {
                if *entry == owner {
                    *entry = new_owner;
                }
            }
            events.push(WalletEvent::OwnerRemoval { owner });
            events.push(WalletEvent::OwnerAddition { owner: new_owner });
        } else if sel == calldata::selector("changeRequirement(uint256)") {
            let required = word_u32(data, 0).ok_or(())?;
            if required == 0 || required > state.owners.len() as u32 {
                return Err(());
            }
            state.required = required;
            events.push(WalletEvent::RequirementChange { required });
        } else {
            return Err(());
        }
        Ok(events)
    }
}

fn word(data: &[u8], index: usize) -> Option<&[u8]> {
    let start = 4 + index * 32;
    data.get(start..start + 32)
}

fn word_address(data: &[u8], index: usize) -> Option<Address> {
    let word = word(data, index)?;
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Some(Address::new(bytes))
}

fn word_u32(data: &[u8], index: usize) -> Option<u32> {
    let word = word(data, index)?;
    if word[..28].iter().any(|byte| *byte != 0) {
        return None;
    }
    Some(u32::from_be_bytes([word[28], word[29], word[30], word[31]]))
}

pub struct MockLedgerGateway {
    contract: Arc<MockContract>,
    account: Address,
}

impl MockLedgerGateway {
    pub fn account(&self) -> Address {
        self.account
    }
}

#[async_trait]
impl LedgerGateway for MockLedgerGateway {
    async fn get_owners(&self) -> Result<Vec<Address>> {
        let state = self.contract.lock_state("mock get_owners")?;
        MockContract::check_reads(&state, "get_owners")?;
        Ok(state.owners.clone())
    }

    async fn required(&self) -> Result<u32> {
        let state = self.contract.lock_state("mock required")?;
        MockContract::check_reads(&state, "required")?;
        Ok(state.required)
    }

    async fn transaction_count(&self) -> Result<u64> {
        let state = self.contract.lock_state("mock transaction_count")?;
        MockContract::check_reads(&state, "transaction_count")?;
        Ok(state.transactions.len() as u64)
    }

    async fn transaction(&self, id: TxId) -> Result<TxRecord> {
        let state = self.contract.lock_state("mock transaction")?;
        MockContract::check_reads(&state, "transaction")?;
        let entry = state
            .transactions
            .get(id.value() as usize)
            .ok_or_else(|| SyncError::remote_call("transaction", "transaction does not exist"))?;
        Ok(TxRecord { destination: entry.destination, value: entry.value, data: entry.data.clone(), executed: entry.executed })
    }

    async fn get_confirmations(&self, id: TxId) -> Result<Vec<Address>> {
        let state = self.contract.lock_state("mock get_confirmations")?;
        MockContract::check_reads(&state, "get_confirmations")?;
        let entry = state
            .transactions
            .get(id.value() as usize)
            .ok_or_else(|| SyncError::remote_call("get_confirmations", "transaction does not exist"))?;
        Ok(entry.confirmations.clone())
    }

    async fn is_confirmed(&self, id: TxId) -> Result<bool> {
        let state = self.contract.lock_state("mock is_confirmed")?;
        MockContract::check_reads(&state, "is_confirmed")?;
        let entry = state
            .transactions
            .get(id.value() as usize)
            .ok_or_else(|| SyncError::remote_call("is_confirmed", "transaction does not exist"))?;
        Ok(entry.confirmations.len() as u32 >= state.required)
    }

    async fn submit_transaction(&self, destination: Address, value: u128, data: Vec<u8>) -> Result<TxId> {
        self.contract.submit(self.account, destination, value, data)
    }

    async fn confirm_transaction(&self, id: TxId) -> Result<()> {
        self.contract.confirm(self.account, id)
    }

    async fn revoke_confirmation(&self, id: TxId) -> Result<()> {
        self.contract.revoke(self.account, id)
    }

    async fn subscribe(&self) -> Result<EventSubscription> {
        let mut receiver = {
            let events = self
                .contract
                .events
                .lock()
                .map_err(|_| SyncError::StoreLock { operation: "mock subscribe" })?;
            events.subscribe()
        };
        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => yield Ok(event),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        yield Err(SyncError::SubscriptionLost(format!("subscriber lagged, {} events skipped", skipped)));
                    }
                }
            }
        };
        Ok(EventSubscription::new(Box::pin(stream)))
    }
}
