//! # Light-Client Messages
//!
//! What a light client submits to advance or freeze its view of the chain.
//! Handling is an exhaustive match: adding a variant without handling it is
//! a compile error.
//!
//! A `header` message carries a proof produced by this daemon together with
//! the validator-set roots it claims to move between. The roots are checked
//! against the proof's public inputs before the proof itself is verified.
//! `misbehaviour` messages are not supported yet and fail explicitly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tessera_core::{HexBytes, ProveResponse};

use crate::circuit::{digest_to_field, encode_input};
use crate::traits::{ProvingBackend, VerifyError};

/// Two conflicting headers at the same height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Misbehaviour {
    /// First header.
    pub header_a: ProveResponse,
    /// Second header.
    pub header_b: ProveResponse,
}

/// A light-client update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A proven transition to a new validator set.
    Header(ProveResponse),
    /// Evidence of equivocation.
    Misbehaviour(Misbehaviour),
}

/// Why a client message was refused.
#[derive(Error, Debug)]
pub enum ClientMessageError {
    /// The proof or its inputs are malformed.
    #[error(transparent)]
    Verify(#[from] VerifyError),
    /// The proof does not verify.
    #[error("header proof is invalid")]
    InvalidProof,
    /// A claimed root differs from the one the proof commits to.
    #[error("{which} validator-set root does not match the proof's public inputs")]
    RootMismatch {
        /// `trusted` or `untrusted`.
        which: &'static str,
    },
    /// The message kind is recognised but not handled.
    #[error("{0} messages are not implemented")]
    NotImplemented(&'static str),
}

fn check_root(
    claimed: &HexBytes,
    input: Option<&HexBytes>,
    which: &'static str,
) -> Result<(), ClientMessageError> {
    let claimed: [u8; 32] = claimed
        .as_slice()
        .try_into()
        .map_err(|_| ClientMessageError::RootMismatch { which })?;
    if input != Some(&encode_input(&digest_to_field(&claimed))) {
        return Err(ClientMessageError::RootMismatch { which });
    }
    Ok(())
}

/// Verify `message` with `backend`.
pub fn verify_client_message(
    backend: &dyn ProvingBackend,
    message: &ClientMessage,
) -> Result<(), ClientMessageError> {
    match message {
        ClientMessage::Header(header) => {
            let inputs = &header.public_inputs;
            check_root(&header.trusted_validator_set_root, inputs.first(), "trusted")?;
            check_root(&header.untrusted_validator_set_root, inputs.get(1), "untrusted")?;
            if backend.verify(header.proof.as_slice(), inputs)? {
                Ok(())
            } else {
                Err(ClientMessageError::InvalidProof)
            }
        }
        ClientMessage::Misbehaviour(_) => Err(ClientMessageError::NotImplemented("misbehaviour")),
    }
}
