//! Call-data encoding for wrapped owner-management submissions.
//!
//! Changing owners or the threshold is not a privileged direct call: the
//! management call is encoded and submitted as the payload of an ordinary
//! transaction against the wallet's own address, so it passes through the
//! same confirmation quorum as everything else.

use crate::foundation::Address;
use sha3::{Digest, Keccak256};

const WORD: usize = 32;

/// First four bytes of the Keccak-256 hash of the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

fn push_address(out: &mut Vec<u8>, address: &Address) {
    out.extend_from_slice(&[0u8; WORD - 20]);
    out.extend_from_slice(address.as_bytes());
}

fn push_u256(out: &mut Vec<u8>, value: u128) {
    out.extend_from_slice(&[0u8; WORD - 16]);
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn add_owner(owner: &Address) -> Vec<u8> {
    let mut out = selector("addOwner(address)").to_vec();
    push_address(&mut out, owner);
    out
}

pub fn remove_owner(owner: &Address) -> Vec<u8> {
    let mut out = selector("removeOwner(address)").to_vec();
    push_address(&mut out, owner);
    out
}

pub fn replace_owner(owner: &Address, new_owner: &Address) -> Vec<u8> {
    let mut out = selector("replaceOwner(address,address)").to_vec();
    push_address(&mut out, owner);
    push_address(&mut out, new_owner);
    out
}

pub fn change_requirement(required: u32) -> Vec<u8> {
    let mut out = selector("changeRequirement(uint256)").to_vec();
    push_u256(&mut out, required as u128);
    out
}
