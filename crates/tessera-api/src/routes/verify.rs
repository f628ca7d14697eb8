//! # Verification API
//!
//! Proof verification against the daemon's verifying key, verifying-key
//! export, and light-client message checks.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use tessera_core::HexBytes;
use tessera_zkp::{verify_client_message, ClientMessage, ProofBackend};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// A proof and the public inputs it claims.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Serialized proof.
    pub proof: HexBytes,
    /// 32-byte little-endian scalars, in circuit order.
    pub public_inputs: Vec<HexBytes>,
}

/// Verification verdict.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Whether the proof verifies.
    pub valid: bool,
}

/// The daemon's verifying key.
#[derive(Debug, Serialize)]
pub struct VerifyingKeyResponse {
    /// Backend the key belongs to.
    pub backend: ProofBackend,
    /// Serialized key.
    pub verifying_key: HexBytes,
}

/// A client message that passed every check.
#[derive(Debug, Serialize)]
pub struct ClientMessageResponse {
    /// Always `true`; refusals are errors.
    pub accepted: bool,
}

/// Build the verification router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/verify", post(verify))
        .route("/v1/verifying-key", get(verifying_key))
        .route("/v1/client-messages", post(client_message))
}

/// POST /v1/verify: Verify a proof.
///
/// A well-formed proof that does not verify is `{"valid": false}`; malformed
/// input is a 422.
async fn verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let req = extract_json(body)?;
    let valid = state
        .orchestrator
        .backend()
        .verify(req.proof.as_slice(), &req.public_inputs)?;
    Ok(Json(VerifyResponse { valid }))
}

/// GET /v1/verifying-key: Export the verifying key.
async fn verifying_key(State(state): State<AppState>) -> Json<VerifyingKeyResponse> {
    let backend = state.orchestrator.backend();
    Json(VerifyingKeyResponse {
        backend: backend.kind(),
        verifying_key: HexBytes(backend.verifying_key()),
    })
}

/// POST /v1/client-messages: Check a light-client update.
async fn client_message(
    State(state): State<AppState>,
    body: Result<Json<ClientMessage>, JsonRejection>,
) -> Result<Json<ClientMessageResponse>, AppError> {
    let message = extract_json(body)?;
    verify_client_message(state.orchestrator.backend().as_ref(), &message)?;
    Ok(Json(ClientMessageResponse { accepted: true }))
}
