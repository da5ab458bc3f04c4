// handlers/guidance.rs - GET /api/parent/guidance-notes handler

use axum::{
    extract::{Request, State},
    response::Response,
};
use serde_json::{json, Value};

use crate::proxy::{FailureMode, NotFoundPolicy, ProxyEndpoint};
use crate::state::AppState;

fn no_notes() -> Value {
    json!({ "items": [] })
}

/// Parents without notes get a 404 upstream; the page shows an empty list.
pub const GUIDANCE_NOTES: ProxyEndpoint = ProxyEndpoint {
    name: "guidance.notes",
    upstream: "/api/parent/guidance-notes",
    not_found: NotFoundPolicy::EmptyCollection,
    failure: FailureMode::SoftFail(no_notes),
    error_message: "Rehberlik notları alınamadı",
    ..ProxyEndpoint::DEFAULTS
};

pub async fn list(State(state): State<AppState>, req: Request) -> Response {
    GUIDANCE_NOTES.forward(&state, &[], req).await
}
