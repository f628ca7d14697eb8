//! # tessera-api: Proof Daemon
//!
//! Accepts proof requests over HTTP, runs at most one proving job per
//! distinct request, and bounds how many run at once.
//!
//! ## API Surface
//!
//! | Route                          | Module               | Operation          |
//! |--------------------------------|----------------------|--------------------|
//! | `POST /v1/proofs`              | [`routes::proofs`]   | Submit / poll      |
//! | `POST /v1/proofs/sync`         | [`routes::proofs`]   | ProveSync          |
//! | `GET /v1/proofs/{fingerprint}` | [`routes::proofs`]   | Status lookup      |
//! | `POST /v1/verify`              | [`routes::verify`]   | Verify             |
//! | `GET /v1/verifying-key`        | [`routes::verify`]   | ExportVerifyingKey |
//! | `POST /v1/client-messages`     | [`routes::verify`]   | Client message     |
//! | `GET /v1/stats`                | [`routes::stats`]    | QueryStats         |
//!
//! ## Job Pipeline
//!
//! ```text
//! handler → Orchestrator::submit → JobRegistry (dedup) + AdmissionController
//!                                → spawn_blocking(ProvingBackend::prove)
//! ```
//!
//! ## Crate Policy
//!
//! - No proving logic in route handlers; they delegate to the orchestrator.
//! - All errors map to structured HTTP responses via `AppError`.

pub mod admission;
pub mod bootstrap;
pub mod error;
pub mod extractors;
pub mod orchestrator;
pub mod registry;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use orchestrator::{Orchestrator, OrchestratorSettings, RetryPolicy};
pub use state::{AppConfig, AppState};

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::proofs::router())
        .merge(routes::verify::router())
        .merge(routes::stats::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: the router only exists once bootstrap has loaded the
/// backend.
async fn readiness() -> &'static str {
    "ready"
}
