// handlers/payments.rs - payment records and totals

use axum::{
    extract::{Request, State},
    response::Response,
};

use crate::proxy::ProxyEndpoint;
use crate::state::AppState;

pub const PAYMENTS: ProxyEndpoint = ProxyEndpoint {
    name: "payments",
    upstream: "/api/payments",
    error_message: "Ödemeler alınamadı",
    ..ProxyEndpoint::DEFAULTS
};

pub const PAYMENT_STATS: ProxyEndpoint = ProxyEndpoint {
    name: "payments.stats",
    upstream: "/api/payments/stats",
    error_message: "Ödeme özeti alınamadı",
    ..ProxyEndpoint::DEFAULTS
};

/// GET|POST /api/payments
pub async fn collection(State(state): State<AppState>, req: Request) -> Response {
    PAYMENTS.forward(&state, &[], req).await
}

/// GET /api/payments/stats
pub async fn stats(State(state): State<AppState>, req: Request) -> Response {
    PAYMENT_STATS.forward(&state, &[], req).await
}
