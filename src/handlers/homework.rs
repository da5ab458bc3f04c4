// handlers/homework.rs - homework, submissions and grading

use axum::{
    extract::{Path, Request, State},
    response::Response,
};

use crate::proxy::ProxyEndpoint;
use crate::state::AppState;

pub const HOMEWORK: ProxyEndpoint = ProxyEndpoint {
    name: "homework",
    upstream: "/api/homework",
    error_message: "Ödevler alınamadı",
    ..ProxyEndpoint::DEFAULTS
};

pub const HOMEWORK_ITEM: ProxyEndpoint = ProxyEndpoint {
    name: "homework.item",
    upstream: "/api/homework/{id}",
    ..ProxyEndpoint::DEFAULTS
};

/// Submissions may be multipart uploads; the body is relayed byte for byte.
pub const SUBMISSIONS: ProxyEndpoint = ProxyEndpoint {
    name: "homework.submissions",
    upstream: "/api/homework/{id}/submissions",
    ..ProxyEndpoint::DEFAULTS
};

pub const GRADE: ProxyEndpoint = ProxyEndpoint {
    name: "homework.grade",
    upstream: "/api/homework/submissions/{id}/grade",
    error_message: "Not kaydedilemedi",
    ..ProxyEndpoint::DEFAULTS
};

/// GET|POST /api/homework
pub async fn collection(State(state): State<AppState>, req: Request) -> Response {
    HOMEWORK.forward(&state, &[], req).await
}

/// GET|PATCH|DELETE /api/homework/:id
pub async fn item(State(state): State<AppState>, Path(id): Path<String>, req: Request) -> Response {
    HOMEWORK_ITEM.forward(&state, &[("id", id)], req).await
}

/// GET|POST /api/homework/:id/submissions
pub async fn submissions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> Response {
    SUBMISSIONS.forward(&state, &[("id", id)], req).await
}

/// PATCH /api/homework/submissions/:id/grade
pub async fn grade(State(state): State<AppState>, Path(id): Path<String>, req: Request) -> Response {
    GRADE.forward(&state, &[("id", id)], req).await
}
