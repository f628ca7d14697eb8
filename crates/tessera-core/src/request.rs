//! # Proof Requests
//!
//! A [`ProveRequest`] asks the daemon to prove that a consensus vote was
//! signed by a quorum of a validator set. It is immutable once received and
//! carries two commits over the same vote: one against the validator set the
//! light client already trusts, one against the new (untrusted) set.
//!
//! ## Invariants
//!
//! For each commit: `signatures.len() <= validators.len() <= MAX_VALIDATORS`,
//! the bitmap is exactly `ceil(validators / 8)` bytes with no bit set beyond
//! the last validator, and the number of set bits equals the number of
//! signatures. [`ProveRequest::validate`] enforces all of them.

use serde::{Deserialize, Serialize};

use crate::bytes::HexBytes;
use crate::canonical::CanonicalBytes;
use crate::digest::{sha256_raw, Fingerprint};
use crate::error::{CanonicalizationError, ValidationError};

/// Number of validator slots in the consensus circuit.
pub const MAX_VALIDATORS: usize = 128;

/// Consensus vote kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    /// First voting round.
    Prevote,
    /// Commit round.
    Precommit,
}

/// Header of the block part set a vote refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartSetHeader {
    /// Number of parts.
    pub total: u32,
    /// Merkle root of the parts.
    pub hash: HexBytes,
}

/// Identifier of the block a vote refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId {
    /// Block header hash.
    pub hash: HexBytes,
    /// Part set header.
    pub part_set_header: PartSetHeader,
}

/// The vote every signature in a commit signs over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalVote {
    /// Vote kind.
    pub vote_type: VoteType,
    /// Block height.
    pub height: u64,
    /// Consensus round.
    pub round: u32,
    /// Target block.
    pub block_id: BlockId,
    /// Chain identifier.
    pub chain_id: String,
}

impl CanonicalVote {
    /// Digest of the vote's canonical sign bytes.
    pub fn sign_digest(&self) -> Result<[u8; 32], CanonicalizationError> {
        Ok(sha256_raw(CanonicalBytes::new(self)?.as_bytes()))
    }
}

/// A validator as seen by the light client: public key and voting power.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleValidator {
    /// Serialized public key.
    pub public_key: HexBytes,
    /// Voting power.
    pub voting_power: u64,
}

/// One commit: the validator set, the signatures, and which validators signed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatorSetCommit {
    /// Ordered validator set.
    pub validators: Vec<SimpleValidator>,
    /// Signatures, in validator order, of the validators selected by `bitmap`.
    pub signatures: Vec<HexBytes>,
    /// Little-endian signer bitmap: bit `i` of byte `i / 8` is validator `i`.
    pub bitmap: HexBytes,
}

impl ValidatorSetCommit {
    /// Whether validator `index` signed.
    pub fn signed(&self, index: usize) -> bool {
        self.bitmap
            .as_slice()
            .get(index / 8)
            .map(|byte| (byte >> (index % 8)) & 1 == 1)
            .unwrap_or(false)
    }

    /// Number of bits set in the bitmap.
    pub fn signer_count(&self) -> usize {
        self.bitmap
            .as_slice()
            .iter()
            .map(|b| b.count_ones() as usize)
            .sum()
    }

    /// Total voting power of the set.
    pub fn total_power(&self) -> Option<u64> {
        self.validators
            .iter()
            .try_fold(0u64, |acc, v| acc.checked_add(v.voting_power))
    }

    /// Voting power of the validators that signed.
    pub fn signed_power(&self) -> Option<u64> {
        self.validators
            .iter()
            .enumerate()
            .filter(|(i, _)| self.signed(*i))
            .try_fold(0u64, |acc, (_, v)| acc.checked_add(v.voting_power))
    }

    fn validate(&self, commit: &'static str) -> Result<(), ValidationError> {
        let validators = self.validators.len();
        if validators > MAX_VALIDATORS {
            return Err(ValidationError::ValidatorCountExceeded {
                commit,
                count: validators,
                max: MAX_VALIDATORS,
            });
        }
        if self.signatures.len() > validators {
            return Err(ValidationError::SignatureCountExceeded {
                commit,
                signatures: self.signatures.len(),
                validators,
            });
        }
        let bytes = self.bitmap.len();
        let overhang = (bytes * 8).saturating_sub(validators);
        let stray_bits = (validators..validators + overhang).any(|i| self.signed(i));
        if bytes != validators.div_ceil(8) || stray_bits {
            return Err(ValidationError::BitmapLengthMismatch {
                commit,
                bytes,
                validators,
            });
        }
        let signers = self.signer_count();
        if signers != self.signatures.len() {
            return Err(ValidationError::SignerCountMismatch {
                commit,
                signers,
                signatures: self.signatures.len(),
            });
        }
        if self.total_power().is_none() {
            return Err(ValidationError::VotingPowerOverflow { commit });
        }
        Ok(())
    }
}

/// A request to prove consensus-signature validity for a light-client update.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProveRequest {
    /// The vote both commits sign.
    pub vote: CanonicalVote,
    /// Commit by the validator set the light client already trusts.
    pub trusted_commit: ValidatorSetCommit,
    /// Commit by the validator set being adopted.
    pub untrusted_commit: ValidatorSetCommit,
}

impl ProveRequest {
    /// Check the structural bounds of both commits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.trusted_commit.validate("trusted")?;
        self.untrusted_commit.validate("untrusted")
    }

    /// Compute the dedup fingerprint of this request.
    pub fn fingerprint(&self) -> Result<Fingerprint, CanonicalizationError> {
        Ok(Fingerprint::of(&CanonicalBytes::new(self)?))
    }
}
