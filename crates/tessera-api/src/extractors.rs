//! # Extractors
//!
//! Helpers that turn axum rejections into [`AppError`]s, so every malformed
//! body or path answers with the same JSON error shape.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use tessera_core::Fingerprint;

use crate::error::AppError;

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse a hex fingerprint from a path segment.
pub fn parse_fingerprint(raw: &str) -> Result<Fingerprint, AppError> {
    Fingerprint::from_hex(raw)
        .map_err(|e| AppError::BadRequest(format!("invalid fingerprint {raw:?}: {e}")))
}
