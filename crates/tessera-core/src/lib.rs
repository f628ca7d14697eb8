#![deny(missing_docs)]

//! # tessera-core: Foundational Types for the tessera Proof Daemon
//!
//! Every other crate in the workspace depends on this one. It has no internal
//! crate dependencies, only `serde`, `serde_json`, `thiserror`, `sha2` and
//! `hex` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Requests are validated before they are fingerprinted.** A
//!    [`ProveRequest`] that violates the validator/signature bounds never
//!    reaches the job registry.
//!
//! 2. **[`CanonicalBytes`] is the sole path to a [`Fingerprint`].** Two
//!    requests that are equal on the wire canonicalize to the same bytes and
//!    therefore the same dedup key, across process restarts.
//!
//! 3. **[`TesseraError`] hierarchy.** Structured errors with `thiserror`, no
//!    `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod bytes;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod merkle;
pub mod request;
pub mod response;

// Re-export primary types at crate root for ergonomic imports.
pub use bytes::HexBytes;
pub use canonical::CanonicalBytes;
pub use digest::{sha256_raw, Fingerprint};
pub use error::{CanonicalizationError, TesseraError, ValidationError};
pub use merkle::validator_set_root;
pub use request::{
    BlockId, CanonicalVote, PartSetHeader, ProveRequest, SimpleValidator, ValidatorSetCommit,
    VoteType, MAX_VALIDATORS,
};
pub use response::ProveResponse;
