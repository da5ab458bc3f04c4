// handlers/auth/session.rs - GET /api/auth/session handler

use serde::Serialize;

use crate::auth::Role;
use crate::middleware::{ApiResponse, SessionUser};

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub roles: Vec<Role>,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

/// Identity behind the caller's session; 401 when there is none.
pub async fn session_get(user: SessionUser) -> ApiResponse<SessionView> {
    let SessionUser { claims, roles } = user;

    ApiResponse::success(SessionView {
        id: claims.sub,
        email: claims.email,
        name: claims.name,
        roles: roles.into_iter().collect(),
        expires_at: claims.exp,
    })
}
