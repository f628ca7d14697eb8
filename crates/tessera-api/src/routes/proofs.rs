//! # Proof Job API
//!
//! `Submit`, `ProveSync` and a side-effect-free status lookup.
//!
//! Submitting the same request again is how a client polls: the fingerprint
//! in the response is stable, and the body moves from `pending` to exactly
//! one of `done` or `failed`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use tessera_core::{Fingerprint, ProveRequest, ProveResponse};

use crate::error::AppError;
use crate::extractors::{extract_json, parse_fingerprint};
use crate::registry::PollResult;
use crate::state::AppState;

/// Job state plus the fingerprint to poll it by.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    /// Dedup key of the request.
    pub fingerprint: Fingerprint,
    /// Current state.
    #[serde(flatten)]
    pub state: PollResult,
}

impl JobResponse {
    fn status_code(&self) -> StatusCode {
        if self.state.is_terminal() {
            StatusCode::OK
        } else {
            StatusCode::ACCEPTED
        }
    }
}

/// Build the proofs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/proofs", post(submit))
        .route("/v1/proofs/sync", post(prove_sync))
        .route("/v1/proofs/{fingerprint}", get(status))
}

/// POST /v1/proofs: Submit or poll a proof job.
///
/// 202 while pending, 200 once terminal, 429 when every slot is busy.
async fn submit(
    State(state): State<AppState>,
    body: Result<Json<ProveRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JobResponse>), AppError> {
    let req = extract_json(body)?;
    let (fingerprint, job_state) = state.orchestrator.submit(&req)?;
    let job = JobResponse {
        fingerprint,
        state: job_state,
    };
    Ok((job.status_code(), Json(job)))
}

/// POST /v1/proofs/sync: Submit and wait for the proof.
async fn prove_sync(
    State(state): State<AppState>,
    body: Result<Json<ProveRequest>, JsonRejection>,
) -> Result<Json<ProveResponse>, AppError> {
    let req = extract_json(body)?;
    let response = state.orchestrator.prove_sync(&req, state.sync_retry).await?;
    Ok(Json(response))
}

/// GET /v1/proofs/{fingerprint}: Current state of a known job.
async fn status(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<(StatusCode, Json<JobResponse>), AppError> {
    let fingerprint = parse_fingerprint(&raw)?;
    let job_state = state
        .orchestrator
        .status(&fingerprint)
        .ok_or_else(|| AppError::NotFound(format!("no job with fingerprint {fingerprint}")))?;
    let job = JobResponse {
        fingerprint,
        state: job_state,
    };
    Ok((job.status_code(), Json(job)))
}
