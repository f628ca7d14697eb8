//! Proof responses produced by a proving backend.

use serde::{Deserialize, Serialize};

use crate::bytes::HexBytes;

/// The outcome of a successful proof job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProveResponse {
    /// Serialized proof (compressed curve points for Groth16).
    pub proof: HexBytes,
    /// Public inputs the proof was produced against, one 32-byte
    /// little-endian scalar each, in circuit order.
    pub public_inputs: Vec<HexBytes>,
    /// Merkle root of the trusted validator set.
    pub trusted_validator_set_root: HexBytes,
    /// Merkle root of the untrusted validator set.
    pub untrusted_validator_set_root: HexBytes,
}
