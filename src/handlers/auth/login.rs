// handlers/auth/login.rs - POST /api/auth/login handler

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::auth::cookies::session_cookie;
use crate::auth::Claims;
use crate::error::ApiError;
use crate::proxy::endpoint::outbound_content_type;
use crate::proxy::envelope::{decode_body, json_response};
use crate::proxy::{CookieForwarding, ProxyEndpoint, QueryPolicy};
use crate::state::AppState;

const LOGIN_FAILED: &str = "Giriş yapılamadı";

pub const LOGIN: ProxyEndpoint = ProxyEndpoint {
    name: "auth.login",
    upstream: "/api/auth/login",
    query: QueryPolicy::Drop,
    cookies: CookieForwarding::Omit,
    error_message: LOGIN_FAILED,
    ..ProxyEndpoint::DEFAULTS
};

/// Token fields the backend has used over time.
const TOKEN_FIELDS: [&str; 2] = ["token", "accessToken"];

/**
 * POST /api/auth/login - exchange credentials for a session cookie
 *
 * The credentials are relayed to the backend untouched. On success the
 * returned token is verified before it is stored, then removed from the
 * JSON body so page scripts never see it. Upstream failures (wrong
 * password, locked account) pass through with their status.
 */
pub async fn login_post(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let url = match LOGIN.resolve_url(&state.config.upstream.base_url, &[], &[]) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("cannot build login URL: {}", e);
            return failure();
        }
    };

    let upstream = match state
        .client
        .post(url)
        .header(header::ACCEPT, "application/json")
        .header(header::CONTENT_TYPE, outbound_content_type(&headers))
        .body(body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(endpoint = LOGIN.name, "upstream call failed: {}", e);
            return failure();
        }
    };

    let status = upstream.status();
    let retry_after = upstream.headers().get(header::RETRY_AFTER).cloned();
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(endpoint = LOGIN.name, "failed to read upstream body: {}", e);
            return failure();
        }
    };

    if !status.is_success() {
        return LOGIN.shape(status, retry_after, &bytes);
    }

    let mut payload = decode_body(&bytes);
    let Some(token) = take_token(&mut payload) else {
        tracing::warn!("backend login succeeded without a token");
        return ApiError::bad_gateway(LOGIN_FAILED).into_response_with_no_store();
    };

    let claims = match state.verifier.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("backend issued a token the gateway cannot verify: {}", e);
            return ApiError::bad_gateway(LOGIN_FAILED).into_response_with_no_store();
        }
    };

    tracing::info!(sub = %claims.sub, "session started");

    let mut response = json_response(status, payload, None);
    for cookie in login_cookies(&state, &token, &claims) {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!("skipping unencodable cookie: {}", e),
        }
    }
    response
}

/// Remove and return the session token from a login payload.
fn take_token(payload: &mut Value) -> Option<String> {
    let map = payload.as_object_mut()?;
    let mut found = None;
    for field in TOKEN_FIELDS {
        if let Some(Value::String(token)) = map.remove(field) {
            found.get_or_insert(token);
        }
    }
    found.filter(|token| !token.trim().is_empty())
}

/// Session cookie plus the role hint cookie, both capped at the token expiry.
fn login_cookies(state: &AppState, token: &str, claims: &Claims) -> Vec<String> {
    let session = &state.config.session;
    let secure = state.config.security.require_https;
    let remaining = claims.exp - Utc::now().timestamp();
    let max_age = session.cookie_max_age_secs.min(remaining);

    let roles: Vec<&str> = claims.role_set().iter().map(|role| role.as_str()).collect();

    let mut cookies = vec![session_cookie(session.primary_cookie(), token, max_age, secure)];
    if !roles.is_empty() {
        cookies.push(session_cookie(&session.role_cookie, &roles.join(","), max_age, secure));
    }
    cookies
}

fn failure() -> Response {
    json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": LOGIN_FAILED }), None)
}
