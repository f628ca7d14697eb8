#![deny(missing_docs)]

//! # tessera-zkp: Proving Backends
//!
//! The daemon talks to exactly one [`ProvingBackend`]. This crate defines
//! that capability and ships its implementations.
//!
//! ## Architecture
//!
//! - **Traits** (`traits.rs`): [`ProvingBackend`] and its error types. The
//!   orchestrator only ever holds an `Arc<dyn ProvingBackend>`.
//!
//! - **Circuit** (`circuit.rs`): the fixed-shape consensus circuit. Its
//!   R1CS does not depend on the request, so one trusted setup serves every
//!   proof.
//!
//! - **Groth16** (`groth16.rs`): [`Groth16Backend`] over BN254. Keys come
//!   either from a `tessera-ceremony` run or, for local bring-up, from a
//!   single-party setup persisted next to the circuit.
//!
//! - **Mock** (`mock.rs`, feature `mock`): SHA-256 "proofs" with no
//!   cryptographic soundness. [`ProofPolicy`] rejects it in production.
//!
//! - **Client messages** (`client_message.rs`): the light-client update
//!   union, matched exhaustively.
//!
//! ## Crate Policy
//!
//! - Depends on `tessera-core` for the request model and on
//!   `tessera-ceremony` for the R1CS encoding.
//! - No `unwrap()` outside tests; every failure is a typed error.

pub mod circuit;
pub mod client_message;
pub mod groth16;
pub mod keys;
#[cfg(feature = "mock")]
pub mod mock;
pub mod policy;
pub mod traits;

pub use circuit::{ConsensusCircuit, ConsensusWitness, NUM_PUBLIC_INPUTS, SLOTS};
pub use client_message::{verify_client_message, ClientMessage, ClientMessageError, Misbehaviour};
pub use groth16::{ArtifactPaths, Groth16Backend};
#[cfg(feature = "mock")]
pub use mock::MockBackend;
pub use policy::{PolicyError, PolicyMode, ProofBackend, ProofPolicy};
pub use traits::{BackendError, BackendStats, ProofError, ProvingBackend, VerifyError};
