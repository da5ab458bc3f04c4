// handlers/health.rs - GET /health handler

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// Liveness plus a registration store ping. A failing store answers 503 so
/// load balancers stop routing to this instance.
pub async fn health_get(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match state.registrations.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "store": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": timestamp
            })),
        ),
        Err(e) => {
            tracing::warn!("registration store ping failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "store": "unavailable",
                    "version": env!("CARGO_PKG_VERSION"),
                    "timestamp": timestamp
                })),
            )
        }
    }
}
