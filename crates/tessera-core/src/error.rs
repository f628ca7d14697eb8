//! # Error Types: Structured Error Hierarchy
//!
//! Defines the request-level error types shared by the daemon and its tooling.
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Validation errors carry the offending count and the bound it violated so
//!   a caller can correct the request without guesswork.
//! - Validation happens synchronously on submission, never inside a job.

use thiserror::Error;

/// Top-level error type for tessera-core.
#[derive(Error, Debug)]
pub enum TesseraError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The request violated a structural bound.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Request-level validation failures.
///
/// Rejected before admission control; a request that fails validation never
/// occupies a job slot or a registry entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A commit lists more validators than the circuit has slots for.
    #[error("{commit} commit has {count} validators (maximum {max})")]
    ValidatorCountExceeded {
        /// Which commit (`trusted` or `untrusted`).
        commit: &'static str,
        /// Number of validators supplied.
        count: usize,
        /// The fixed maximum.
        max: usize,
    },

    /// A commit carries more signatures than validators.
    #[error("{commit} commit has {signatures} signatures for {validators} validators")]
    SignatureCountExceeded {
        /// Which commit (`trusted` or `untrusted`).
        commit: &'static str,
        /// Number of signatures supplied.
        signatures: usize,
        /// Number of validators supplied.
        validators: usize,
    },

    /// The signer bitmap does not cover exactly the validator list.
    #[error("{commit} commit bitmap is {bytes} bytes with bits beyond validator {validators}")]
    BitmapLengthMismatch {
        /// Which commit (`trusted` or `untrusted`).
        commit: &'static str,
        /// Length of the bitmap in bytes.
        bytes: usize,
        /// Number of validators supplied.
        validators: usize,
    },

    /// The number of set bitmap bits differs from the number of signatures.
    #[error("{commit} commit bitmap selects {signers} signers but carries {signatures} signatures")]
    SignerCountMismatch {
        /// Which commit (`trusted` or `untrusted`).
        commit: &'static str,
        /// Number of bits set in the bitmap.
        signers: usize,
        /// Number of signatures supplied.
        signatures: usize,
    },

    /// Summed voting power does not fit the field arithmetic of the circuit.
    #[error("{commit} commit voting power overflows u64")]
    VotingPowerOverflow {
        /// Which commit (`trusted` or `untrusted`).
        commit: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_count_message_names_bound() {
        let err = ValidationError::ValidatorCountExceeded {
            commit: "trusted",
            count: 129,
            max: 128,
        };
        assert_eq!(
            err.to_string(),
            "trusted commit has 129 validators (maximum 128)"
        );
    }

    #[test]
    fn validation_error_wraps_into_top_level() {
        let err: TesseraError = ValidationError::SignatureCountExceeded {
            commit: "untrusted",
            signatures: 5,
            validators: 4,
        }
        .into();
        assert!(err.to_string().starts_with("validation error:"));
    }
}
