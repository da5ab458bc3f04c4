// handlers/exams.rs - exams, exam images, analysis, deletion and downloads

use axum::{
    extract::{Path, Request, State},
    http::HeaderMap,
    response::Response,
};
use serde_json::{json, Value};

use crate::proxy::{BinaryEndpoint, CookieForwarding, FailureMode, ProxyEndpoint, QueryPolicy};
use crate::state::AppState;

fn no_analysis() -> Value {
    json!({ "analysis": null })
}

pub const EXAMS: ProxyEndpoint = ProxyEndpoint {
    name: "exams",
    upstream: "/api/exams",
    error_message: "Sınavlar alınamadı",
    ..ProxyEndpoint::DEFAULTS
};

pub const EXAM_ITEM: ProxyEndpoint = ProxyEndpoint {
    name: "exams.item",
    upstream: "/api/exams/{id}",
    ..ProxyEndpoint::DEFAULTS
};

pub const EXAM_IMAGES: ProxyEndpoint = ProxyEndpoint {
    name: "exams.images",
    upstream: "/api/exams/{id}/images",
    error_message: "Görsel yüklenemedi",
    ..ProxyEndpoint::DEFAULTS
};

/// Analysis is optional on the exam page.
pub const EXAM_ANALYSIS: ProxyEndpoint = ProxyEndpoint {
    name: "exams.analysis",
    upstream: "/api/exams/{id}/analysis",
    failure: FailureMode::SoftFail(no_analysis),
    error_message: "Analiz alınamadı",
    ..ProxyEndpoint::DEFAULTS
};

/// The backend deletes through `POST /api/exams/delete?id=`.
pub const EXAM_DELETE: ProxyEndpoint = ProxyEndpoint {
    name: "exams.delete",
    upstream: "/api/exams/delete",
    query: QueryPolicy::Drop,
    params_as_query: &["id"],
    error_message: "Sınav silinemedi",
    ..ProxyEndpoint::DEFAULTS
};

pub const EXAM_DOWNLOAD: BinaryEndpoint = BinaryEndpoint {
    name: "exams.download",
    upstream: "/api/exams/{id}/download",
    filename: "sinav-{id}.pdf",
    cookies: CookieForwarding::Forward,
};

/// GET|POST /api/exams
pub async fn collection(State(state): State<AppState>, req: Request) -> Response {
    EXAMS.forward(&state, &[], req).await
}

/// GET|PATCH|DELETE /api/exams/:id
pub async fn item(State(state): State<AppState>, Path(id): Path<String>, req: Request) -> Response {
    EXAM_ITEM.forward(&state, &[("id", id)], req).await
}

/// POST /api/exams/:id/images (multipart)
pub async fn images(State(state): State<AppState>, Path(id): Path<String>, req: Request) -> Response {
    EXAM_IMAGES.forward(&state, &[("id", id)], req).await
}

/// GET /api/exams/:id/analysis
pub async fn analysis(State(state): State<AppState>, Path(id): Path<String>, req: Request) -> Response {
    EXAM_ANALYSIS.forward(&state, &[("id", id)], req).await
}

/// POST /api/exams/:id/delete
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>, req: Request) -> Response {
    EXAM_DELETE.forward(&state, &[("id", id)], req).await
}

/// GET /api/exams/:id/download
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    EXAM_DOWNLOAD.download(&state, &[("id", id)], &headers).await
}
