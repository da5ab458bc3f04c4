// handlers/auth/logout.rs - POST /api/auth/logout handler

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use serde_json::json;

use crate::auth::cookies::expired_cookie;
use crate::proxy::envelope::json_response;
use crate::state::AppState;

/// Expire every session cookie name (legacy ones included) and the role hint.
pub async fn logout_post(State(state): State<AppState>) -> Response {
    let session = &state.config.session;
    let secure = state.config.security.require_https;

    let mut response = json_response(StatusCode::OK, json!({ "success": true }), None);
    let names = session
        .cookie_names
        .iter()
        .chain(std::iter::once(&session.role_cookie));

    for name in names {
        if let Ok(value) = HeaderValue::from_str(&expired_cookie(name, secure)) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}
