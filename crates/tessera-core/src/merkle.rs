//! # Validator-Set Roots
//!
//! RFC 6962-style binary Merkle root over a validator set, the same shape
//! CometBFT uses for `ValidatorsHash`: leaves are prefixed with `0x00`, inner
//! nodes with `0x01`, and a set of `n` leaves splits at the largest power of
//! two strictly below `n`.
//!
//! The root is what a light client stores per height; the consensus circuit
//! takes it as a public input.

use sha2::{Digest, Sha256};

use crate::request::SimpleValidator;

const LEAF_PREFIX: u8 = 0x00;
const INNER_PREFIX: u8 = 0x01;

/// Merkle root of an ordered validator set. The empty set hashes to
/// `SHA-256("")`.
pub fn validator_set_root(validators: &[SimpleValidator]) -> [u8; 32] {
    let leaves: Vec<[u8; 32]> = validators.iter().map(leaf_hash).collect();
    root_of(&leaves)
}

fn leaf_hash(validator: &SimpleValidator) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update((validator.public_key.len() as u32).to_be_bytes());
    hasher.update(validator.public_key.as_slice());
    hasher.update(validator.voting_power.to_be_bytes());
    hasher.finalize().into()
}

fn root_of(leaves: &[[u8; 32]]) -> [u8; 32] {
    match leaves.len() {
        0 => Sha256::digest(b"").into(),
        1 => leaves[0],
        n => {
            let split = split_point(n);
            let left = root_of(&leaves[..split]);
            let right = root_of(&leaves[split..]);
            let mut hasher = Sha256::new();
            hasher.update([INNER_PREFIX]);
            hasher.update(left);
            hasher.update(right);
            hasher.finalize().into()
        }
    }
}

/// Largest power of two strictly less than `n` (`n >= 2`).
fn split_point(n: usize) -> usize {
    let p = n.next_power_of_two();
    if p == n {
        n / 2
    } else {
        p / 2
    }
}
