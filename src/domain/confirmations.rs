use crate::foundation::Address;
use serde::{Deserialize, Serialize};

/// The set of owners that have confirmed a transaction.
///
/// Insertion order is preserved for display; equality is order-insensitive.
/// `add` and `remove` are idempotent, and `merge` is a set union, so applying
/// the same remote event twice (or merging the same authoritative snapshot
/// twice) converges to the same state.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ConfirmationSet {
    entries: Vec<Address>,
}

impl ConfirmationSet {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn from_iter(iter: impl IntoIterator<Item = Address>) -> Self {
        let mut set = Self::new();
        for owner in iter {
            set.add(owner);
        }
        set
    }

    /// Record a confirmation. Returns true if the owner was newly added.
    pub fn add(&mut self, owner: Address) -> bool {
        if self.entries.contains(&owner) {
            return false;
        }
        self.entries.push(owner);
        true
    }

    /// Remove a confirmation. Returns true if the owner was present.
    pub fn remove(&mut self, owner: &Address) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry != owner);
        self.entries.len() != before
    }

    pub fn contains(&self, owner: &Address) -> bool {
        self.entries.contains(owner)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.entries.iter()
    }

    /// Union-merge another set into this one. Returns the number of new
    /// entries added.
    pub fn merge(&mut self, other: &ConfirmationSet) -> usize {
        let before = self.entries.len();
        for owner in &other.entries {
            self.add(*owner);
        }
        self.entries.len() - before
    }
}

impl PartialEq for ConfirmationSet {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.entries.iter().all(|owner| other.entries.contains(owner))
    }
}

impl Eq for ConfirmationSet {}

impl IntoIterator for ConfirmationSet {
    type Item = Address;
    type IntoIter = std::vec::IntoIter<Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
