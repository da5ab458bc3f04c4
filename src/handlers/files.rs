// handlers/files.rs - GET /api/files?url= handler

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;

use crate::proxy::fetch_file;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub url: Option<String>,
}

pub async fn fetch(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
    headers: HeaderMap,
) -> Response {
    fetch_file(&state, &headers, query.url.as_deref()).await
}
