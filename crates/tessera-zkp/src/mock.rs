//! # Mock Backend
//!
//! A deterministic, transparent "proof system" for tests and local
//! development. A proof is the SHA-256 digest of a domain tag and the public
//! inputs, so anyone can produce one without a witness.
//!
//! ## Security Notice
//!
//! This backend provides NO soundness. [`ProofPolicy`](crate::ProofPolicy)
//! rejects it in production mode.

use std::time::Duration;

use sha2::{Digest, Sha256};
use tessera_core::{HexBytes, ProveRequest, ProveResponse};

use crate::circuit::{encode_input, ConsensusWitness, NUM_PUBLIC_INPUTS};
use crate::policy::ProofBackend;
use crate::traits::{BackendStats, ProofError, ProvingBackend, VerifyError};

const DOMAIN: &[u8] = b"tessera/mock-proof/v1";

/// Backend whose proofs are hashes of their public inputs.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    latency: Duration,
}

impl MockBackend {
    /// A mock that answers immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that blocks for `latency` inside every `prove` call.
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    fn digest(public_inputs: &[HexBytes]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN);
        for input in public_inputs {
            hasher.update((input.len() as u32).to_be_bytes());
            hasher.update(input.as_slice());
        }
        hasher.finalize().to_vec()
    }
}

impl ProvingBackend for MockBackend {
    fn kind(&self) -> ProofBackend {
        ProofBackend::Mock
    }

    fn prove(&self, request: &ProveRequest) -> Result<ProveResponse, ProofError> {
        let witness = ConsensusWitness::from_request(request)?;
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        let public_inputs: Vec<HexBytes> =
            witness.public_inputs().iter().map(encode_input).collect();
        Ok(ProveResponse {
            proof: HexBytes(Self::digest(&public_inputs)),
            public_inputs,
            trusted_validator_set_root: HexBytes(witness.trusted_root.to_vec()),
            untrusted_validator_set_root: HexBytes(witness.untrusted_root.to_vec()),
        })
    }

    fn verify(&self, proof: &[u8], public_inputs: &[HexBytes]) -> Result<bool, VerifyError> {
        if public_inputs.len() != NUM_PUBLIC_INPUTS {
            return Err(VerifyError::WrongInputCount {
                expected: NUM_PUBLIC_INPUTS,
                actual: public_inputs.len(),
            });
        }
        if proof.len() != 32 {
            return Err(VerifyError::MalformedProof(format!(
                "mock proofs are 32 bytes, got {}",
                proof.len()
            )));
        }
        Ok(proof == Self::digest(public_inputs).as_slice())
    }

    fn verifying_key(&self) -> Vec<u8> {
        DOMAIN.to_vec()
    }

    fn stats(&self) -> BackendStats {
        BackendStats {
            backend: ProofBackend::Mock,
            constraints: 0,
            public_inputs: NUM_PUBLIC_INPUTS,
            witness_variables: 0,
            proving_key_bytes: 0,
            verifying_key_bytes: DOMAIN.len(),
        }
    }
}
