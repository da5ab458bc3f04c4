use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::auth::{Claims, Role, RoleSet};
use crate::error::{ApiError, UNAUTHORIZED_MESSAGE};
use crate::proxy::credentials::session_token;
use crate::state::AppState;

/// Verified session of an API caller.
///
/// Reads a bearer header or one of the configured session cookies. Any
/// failure, including a missing role, answers 401 with the same body.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub claims: Claims,
    pub roles: RoleSet,
}

impl SessionUser {
    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.roles.contains(&role) {
            Ok(())
        } else {
            tracing::info!(sub = %self.claims.sub, required = %role, "api caller lacks role");
            Err(ApiError::unauthorized(UNAUTHORIZED_MESSAGE))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.config.session.cookie_names)
            .ok_or_else(|| ApiError::unauthorized(UNAUTHORIZED_MESSAGE))?;

        let claims = state.verifier.verify(&token).map_err(|e| {
            tracing::debug!("api session rejected: {}", e);
            ApiError::unauthorized(UNAUTHORIZED_MESSAGE)
        })?;

        Ok(Self {
            roles: claims.role_set(),
            claims,
        })
    }
}
