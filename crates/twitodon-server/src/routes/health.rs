//! Liveness endpoint.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Namespace probed to confirm the store answers.
const PROBE_NAMESPACE: &str = "health";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store cannot be read.
    pub status: String,
    pub version: String,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status) = match state.store.get(PROBE_NAMESPACE, "probe").await {
        Ok(_) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::error!(error = %e, "Store probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded")
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
