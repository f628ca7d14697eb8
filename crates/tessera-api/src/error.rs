//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps orchestrator and backend errors to HTTP status codes with a JSON
//! body of the form `{ "error": { "code", "message" } }`. Internal error
//! details are logged, never returned.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tessera_zkp::{ClientMessageError, VerifyError};

use crate::orchestrator::{SubmitError, SyncError};

/// Seconds a `Busy` client is told to wait before resubmitting.
const BUSY_RETRY_AFTER_SECS: &str = "1";

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The error.
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. `BUSY`, `VALIDATION_ERROR`).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown fingerprint (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The request violates a structural bound (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or path could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Every job slot is taken (429). Retry the whole submission.
    #[error("busy: {0}")]
    Busy(String),

    /// The proof job reached `Failed` (502).
    #[error("proof job failed: {0}")]
    JobFailed(String),

    /// `ProveSync` ran out of attempts (504).
    #[error("timed out: {0}")]
    Timeout(String),

    /// Recognised but unsupported operation (501).
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Busy(_) => (StatusCode::TOO_MANY_REQUESTS, "BUSY"),
            Self::JobFailed(_) => (StatusCode::BAD_GATEWAY, "JOB_FAILED"),
            Self::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            Self::NotImplemented(_) => (StatusCode::NOT_IMPLEMENTED, "NOT_IMPLEMENTED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(&self, Self::Busy(_)) {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from_static(BUSY_RETRY_AFTER_SECS),
            );
        }
        response
    }
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Invalid(e) => Self::Validation(e.to_string()),
            SubmitError::Busy(e) => Self::Busy(e.to_string()),
            SubmitError::Fingerprint(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Submit(e) => e.into(),
            SyncError::Failed(message) => Self::JobFailed(message),
            e @ SyncError::Exhausted { .. } => Self::Timeout(e.to_string()),
        }
    }
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::VerificationFailed(_) => Self::Internal(err.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<ClientMessageError> for AppError {
    fn from(err: ClientMessageError) -> Self {
        match err {
            ClientMessageError::Verify(e) => e.into(),
            e @ (ClientMessageError::InvalidProof | ClientMessageError::RootMismatch { .. }) => {
                Self::Validation(e.to_string())
            }
            e @ ClientMessageError::NotImplemented(_) => Self::NotImplemented(e.to_string()),
        }
    }
}
