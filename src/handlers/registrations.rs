// handlers/registrations.rs - public applications and admin review

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::Role;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SessionUser};
use crate::registrations::{Registration, RegistrationRequest, RegistrationStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: String,
}

/// POST /api/registrations - anyone may apply
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> ApiResult<Registration> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let new = request
        .validate()
        .map_err(|fields| ApiError::validation_error("Başvuru bilgileri eksik veya hatalı", Some(fields)))?;

    let registration = state.registrations.create(new).await?;
    tracing::info!(id = %registration.id, role = %registration.role, "registration received");

    Ok(ApiResponse::created(registration))
}

/// GET /api/admin/registrations[?status=]
pub async fn list(
    State(state): State<AppState>,
    user: SessionUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Value> {
    user.require(Role::Admin)?;

    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };

    let items = state.registrations.list(status).await?;
    Ok(ApiResponse::success(json!({ "items": items })))
}

/// GET /api/admin/registrations/:id
pub async fn get(
    State(state): State<AppState>,
    user: SessionUser,
    Path(id): Path<String>,
) -> ApiResult<Registration> {
    user.require(Role::Admin)?;

    let id = parse_id(&id)?;
    let registration = state
        .registrations
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Başvuru bulunamadı: {}", id)))?;

    Ok(ApiResponse::success(registration))
}

/// PATCH /api/admin/registrations/:id with `{ "status": "approved" | "rejected" }`
pub async fn review(
    State(state): State<AppState>,
    user: SessionUser,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<Registration> {
    user.require(Role::Admin)?;

    let id = parse_id(&id)?;
    let Json(update) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let status = parse_status(&update.status)?;

    let registration = state
        .registrations
        .update_status(id, status, &user.claims.sub)
        .await?;

    tracing::info!(
        id = %registration.id,
        status = registration.status.as_str(),
        reviewer = %user.claims.sub,
        "registration reviewed"
    );

    Ok(ApiResponse::success(registration))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request("Geçersiz başvuru numarası"))
}

fn parse_status(raw: &str) -> Result<RegistrationStatus, ApiError> {
    RegistrationStatus::parse(raw).ok_or_else(|| {
        let mut fields = std::collections::HashMap::new();
        fields.insert(
            "status".to_string(),
            "pending, approved veya rejected olmalı".to_string(),
        );
        ApiError::validation_error("Geçersiz başvuru durumu", Some(fields))
    })
}
