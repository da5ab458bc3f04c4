// handlers/reports.rs - GET|POST /api/reports handler

use axum::{
    extract::{Request, State},
    response::Response,
};

use crate::proxy::ProxyEndpoint;
use crate::state::AppState;

pub const REPORTS: ProxyEndpoint = ProxyEndpoint {
    name: "reports",
    upstream: "/api/reports",
    error_message: "Raporlar alınamadı",
    ..ProxyEndpoint::DEFAULTS
};

pub async fn collection(State(state): State<AppState>, req: Request) -> Response {
    REPORTS.forward(&state, &[], req).await
}
