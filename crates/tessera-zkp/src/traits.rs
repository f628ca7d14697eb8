//! # Proving Backend Capability
//!
//! The interface the job orchestrator drives. Implementations must be
//! `Send + Sync`: one backend instance is shared by every job, and `prove`
//! runs on blocking worker threads while `verify` and `stats` are served
//! concurrently from request handlers.
//!
//! The trait is not sealed. [`ProofPolicy`](crate::ProofPolicy)
//! decides at start-up which backends a deployment accepts.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use tessera_ceremony::{CeremonyError, CeremonyFileError};
use tessera_core::{CanonicalizationError, HexBytes, ProveRequest, ProveResponse, ValidationError};

use crate::policy::ProofBackend;

/// Error during proof generation.
///
/// Returned by [`ProvingBackend::prove`]; the orchestrator records its
/// message as the job's failure.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The request violates a structural bound.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),
    /// The vote could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
    /// Proof generation failed internally.
    #[error("proof generation failed: {0}")]
    GenerationFailed(String),
}

/// Error during proof verification.
///
/// A well-formed proof that does not verify is `Ok(false)`, not an error.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The proof bytes do not decode.
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    /// The number of public inputs does not match the circuit.
    #[error("expected {expected} public inputs, got {actual}")]
    WrongInputCount {
        /// Inputs the circuit takes.
        expected: usize,
        /// Inputs supplied.
        actual: usize,
    },
    /// A public input is not a canonical 32-byte scalar.
    #[error("public input {index} is not a canonical 32-byte scalar")]
    MalformedPublicInput {
        /// Position of the offending input.
        index: usize,
    },
    /// The verifier itself failed.
    #[error("proof verification failed: {0}")]
    VerificationFailed(String),
}

/// Error while compiling the circuit or loading its keys.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Filesystem failure on a key or circuit artifact.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// A key file does not decode.
    #[error("malformed key file {path}: {source}")]
    KeyEncoding {
        /// Artifact path.
        path: PathBuf,
        /// Underlying error.
        source: ark_serialize::SerializationError,
    },
    /// The stored R1CS does not decode.
    #[error("malformed circuit file: {0}")]
    Circuit(#[from] CeremonyFileError),
    /// Synthesizing the circuit failed.
    #[error("circuit compilation failed: {0}")]
    Compile(#[from] CeremonyError),
    /// The stored R1CS is not the circuit this binary compiles.
    #[error("stored circuit {path} does not match the compiled consensus circuit")]
    CircuitMismatch {
        /// Path of the stale R1CS.
        path: PathBuf,
    },
    /// The keys do not fit the circuit, or each other.
    #[error("key mismatch: {0}")]
    KeyMismatch(String),
    /// Some, but not all, artifacts exist.
    #[error("artifact set is incomplete: {missing} is missing")]
    IncompleteArtifacts {
        /// The first missing file.
        missing: PathBuf,
    },
    /// Single-party key generation failed.
    #[error("key generation failed: {0}")]
    Setup(String),
}

/// Circuit and key statistics reported by `QueryStats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendStats {
    /// Which backend produced these numbers.
    pub backend: ProofBackend,
    /// Number of R1CS constraints.
    pub constraints: usize,
    /// Public inputs, excluding the constant one.
    pub public_inputs: usize,
    /// Private (witness) variables.
    pub witness_variables: usize,
    /// Serialized proving key size in bytes.
    pub proving_key_bytes: usize,
    /// Serialized verifying key size in bytes.
    pub verifying_key_bytes: usize,
}

/// A proof system the daemon can delegate to.
pub trait ProvingBackend: Send + Sync {
    /// Which kind of backend this is, for policy checks.
    fn kind(&self) -> ProofBackend;

    /// Produce a proof for `request`. CPU-bound; callers run it off the
    /// async executor.
    fn prove(&self, request: &ProveRequest) -> Result<ProveResponse, ProofError>;

    /// Check `proof` against `public_inputs` (32-byte little-endian scalars,
    /// in circuit order).
    fn verify(&self, proof: &[u8], public_inputs: &[HexBytes]) -> Result<bool, VerifyError>;

    /// The serialized verifying key.
    fn verifying_key(&self) -> Vec<u8>;

    /// Circuit and key statistics.
    fn stats(&self) -> BackendStats;
}
