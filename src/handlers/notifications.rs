// handlers/notifications.rs - notification feed and read receipts

use axum::{
    extract::{Path, Request, State},
    response::Response,
};
use serde_json::{json, Value};

use crate::proxy::{CookieForwarding, FailureMode, ProxyEndpoint};
use crate::state::AppState;

fn empty_feed() -> Value {
    json!({ "items": [] })
}

/// The bell must always render, so errors soft-fail. The backend rejects
/// requests carrying both a bearer header and cookies here.
pub const NOTIFICATIONS: ProxyEndpoint = ProxyEndpoint {
    name: "notifications",
    upstream: "/api/notifications",
    cookies: CookieForwarding::Omit,
    failure: FailureMode::SoftFail(empty_feed),
    error_message: "Bildirimler alınamadı",
    ..ProxyEndpoint::DEFAULTS
};

pub const MARK_READ: ProxyEndpoint = ProxyEndpoint {
    name: "notifications.read",
    upstream: "/api/notifications/{id}/read",
    cookies: CookieForwarding::Omit,
    ..ProxyEndpoint::DEFAULTS
};

/// GET /api/notifications
pub async fn list(State(state): State<AppState>, req: Request) -> Response {
    NOTIFICATIONS.forward(&state, &[], req).await
}

/// PATCH /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> Response {
    MARK_READ.forward(&state, &[("id", id)], req).await
}
