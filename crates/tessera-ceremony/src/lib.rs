#![deny(missing_docs)]

//! # tessera-ceremony: Groth16 Trusted Setup over BN254
//!
//! Everything needed to go from a snarkjs powers-of-tau file and a circuit
//! to Groth16 proving and verifying keys without trusting any single party:
//!
//! - **File formats** ([`binfile`], [`ptau`], [`zkey`], [`r1cs`]): strict
//!   readers for the section-tagged container shared by snarkjs and circom.
//!   Malformed input is a typed [`CeremonyFileError`]; every decoded point is
//!   checked for curve and subgroup membership.
//! - **Phase 1** ([`phase1`]): the universal powers of tau, lifted into
//!   tessera's hashed artifact encoding.
//! - **Phase 2** ([`phase2`]): the circuit-specific MPC. `init` evaluates the
//!   QAP in the Lagrange basis, `contribute` re-randomises δ, `verify` checks
//!   a contribution with pairing equations, and `extract` produces
//!   `ark_groth16` keys.
//!
//! Security holds as long as at least one Phase 2 contributor discards
//! their secret and every contribution was verified.

pub mod binfile;
pub mod codec;
pub mod error;
pub mod phase1;
pub mod phase2;
pub mod ptau;
pub mod r1cs;
pub mod zkey;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{CeremonyError, CeremonyFileError, FileErrorKind, VerificationError};
pub use phase1::{short_hash, Phase1};
pub use phase2::{extract, ContributionProof, Phase2, Phase2Evaluations};
pub use ptau::{Ptau, PtauHeader};
pub use r1cs::R1cs;
pub use zkey::{Groth16Header, Zkey};
