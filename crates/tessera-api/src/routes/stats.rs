//! # Statistics API

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::orchestrator::OrchestratorStats;
use crate::state::AppState;

/// Build the stats router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/stats", get(stats))
}

/// GET /v1/stats: Job counts, slot usage, circuit and key sizes.
async fn stats(State(state): State<AppState>) -> Json<OrchestratorStats> {
    Json(state.orchestrator.stats())
}
