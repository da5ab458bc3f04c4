use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::cookies::cookie_value;
use crate::auth::{parse_role_list, Role, SessionVerifier};
use crate::config::SessionConfig;
use crate::state::AppState;

/// A page prefix and the role needed to open it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    pub prefix: &'static str,
    pub role: Role,
}

pub const PROTECTED_ROUTES: &[RouteRule] = &[
    RouteRule { prefix: "/parent", role: Role::Parent },
    RouteRule { prefix: "/teacher", role: Role::Teacher },
    RouteRule { prefix: "/admin", role: Role::Admin },
];

/// Outcome of the page access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Authorized,
    Unauthenticated,
    WrongRole,
}

/// The path the static file service will end up serving.
///
/// Percent escapes are decoded, empty and `.` segments dropped and `..`
/// applied, so `//parent/`, `/%70arent/` and `/x/../parent` all map to
/// `/parent/`. A trailing slash is kept.
pub fn canonical_path(raw: &str) -> String {
    let decoded = urlencoding::decode_binary(raw.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded);

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut path = format!("/{}", segments.join("/"));
    if decoded.ends_with('/') && path != "/" {
        path.push('/');
    }
    path
}

/// Role required by the first rule whose prefix matches `path`.
pub fn required_role(path: &str, rules: &[RouteRule]) -> Option<Role> {
    rules
        .iter()
        .find(|rule| matches_prefix(path, rule.prefix))
        .map(|rule| rule.role)
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Decide whether the page request may proceed.
pub fn evaluate(
    path: &str,
    headers: &HeaderMap,
    session: &SessionConfig,
    verifier: &SessionVerifier,
    rules: &[RouteRule],
) -> Access {
    let path = canonical_path(path);
    if matches_prefix(&path, &session.login_path) {
        return Access::Authorized;
    }

    // Everything outside the protected prefixes (API calls, assets, home)
    // passes. Inside them no file name or extension is exempt.
    let Some(required) = required_role(&path, rules) else {
        return Access::Authorized;
    };

    let Some(token) = cookie_value(headers, session.primary_cookie()) else {
        return Access::Unauthenticated;
    };

    let claims = match verifier.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(path = %path, "session token rejected: {}", e);
            return Access::Unauthenticated;
        }
    };

    // Older sessions carried the role only in a separate cookie.
    let mut roles = claims.role_set();
    if let Some(hint) = cookie_value(headers, &session.role_cookie) {
        roles.extend(parse_role_list(&hint));
    }

    if roles.contains(&required) {
        Access::Authorized
    } else {
        Access::WrongRole
    }
}

/// Redirect to the login page, remembering where the user wanted to go.
pub fn login_redirect(login_path: &str, original_path: &str) -> Response {
    let next: String = url::form_urlencoded::byte_serialize(original_path.as_bytes()).collect();
    Redirect::temporary(&format!("{}?next={}", login_path, next)).into_response()
}

/// Page route protection. Both failure kinds produce the same redirect.
pub async fn route_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let session = &state.config.session;

    match evaluate(&path, req.headers(), session, &state.verifier, PROTECTED_ROUTES) {
        Access::Authorized => next.run(req).await,
        denied => {
            tracing::info!(path = %path, reason = ?denied, "redirecting to login");
            login_redirect(&session.login_path, &path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Claims, SessionSigner};
    use axum::http::{header, HeaderValue, StatusCode};
    use chrono::Duration;

    const SECRET: &str = "guard-secret";

    fn session() -> SessionConfig {
        SessionConfig {
            jwt_secret: SECRET.to_string(),
            cookie_names: vec!["vbs_session".to_string(), "authToken".to_string()],
            role_cookie: "vbs_role".to_string(),
            login_path: "/login".to_string(),
            cookie_max_age_secs: 3600,
        }
    }

    fn cookies(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn token(roles: &[Role]) -> String {
        SessionSigner::new(SECRET)
            .issue(&Claims::new("7", roles, Duration::hours(1)))
            .unwrap()
    }

    fn check(path: &str, headers: &HeaderMap) -> Access {
        evaluate(path, headers, &session(), &SessionVerifier::new(SECRET), PROTECTED_ROUTES)
    }

    #[test]
    fn paths_outside_protected_prefixes_pass() {
        for path in ["/", "/login", "/login/reset", "/api/exams", "/_next/static/x.js", "/favicon.ico", "/robots.txt", "/about"] {
            assert_eq!(check(path, &HeaderMap::new()), Access::Authorized, "{}", path);
        }
    }

    #[test]
    fn canonical_path_normalizes_like_the_file_service() {
        assert_eq!(canonical_path("/parent/"), "/parent/");
        assert_eq!(canonical_path("//parent/"), "/parent/");
        assert_eq!(canonical_path("/%70arent/"), "/parent/");
        assert_eq!(canonical_path("/./parent/./index.html"), "/parent/index.html");
        assert_eq!(canonical_path("/x/../parent"), "/parent");
        assert_eq!(canonical_path("/%2e%2e/teacher"), "/teacher");
        assert_eq!(canonical_path("/admin%2Fusers"), "/admin/users");
        assert_eq!(canonical_path("/"), "/");
        assert_eq!(canonical_path(""), "/");
    }

    #[test]
    fn encoded_and_doubled_paths_are_still_protected() {
        for path in [
            "/parent/index.html",
            "/parent/logo.png",
            "//parent/",
            "/%70arent/",
            "/./parent",
            "/api/../parent/",
            "/%2Fteacher",
            "/admin%2Findex.html",
        ] {
            assert_ne!(check(path, &HeaderMap::new()), Access::Authorized, "{}", path);
        }
    }

    #[test]
    fn prefix_match_respects_segments() {
        assert_eq!(required_role("/parent", PROTECTED_ROUTES), Some(Role::Parent));
        assert_eq!(required_role("/parent/homework", PROTECTED_ROUTES), Some(Role::Parent));
        assert_eq!(required_role("/parents-info", PROTECTED_ROUTES), None);
        assert_eq!(required_role("/about", PROTECTED_ROUTES), None);
    }

    #[test]
    fn unprotected_page_needs_no_session() {
        assert_eq!(check("/about", &HeaderMap::new()), Access::Authorized);
    }

    #[test]
    fn missing_cookie_is_unauthenticated() {
        assert_eq!(check("/parent", &HeaderMap::new()), Access::Unauthenticated);
    }

    #[test]
    fn invalid_token_is_unauthenticated() {
        assert_eq!(check("/parent", &cookies("vbs_session=garbage")), Access::Unauthenticated);
    }

    #[test]
    fn legacy_cookie_does_not_open_pages() {
        let h = cookies(&format!("authToken={}", token(&[Role::Parent])));
        assert_eq!(check("/parent", &h), Access::Unauthenticated);
    }

    #[test]
    fn matching_role_is_authorized() {
        let h = cookies(&format!("vbs_session={}", token(&[Role::Teacher])));
        assert_eq!(check("/teacher/exams", &h), Access::Authorized);
    }

    #[test]
    fn other_role_is_wrong_role() {
        let h = cookies(&format!("vbs_session={}", token(&[Role::Parent])));
        assert_eq!(check("/teacher", &h), Access::WrongRole);
    }

    #[test]
    fn role_cookie_extends_token_roles() {
        let h = cookies(&format!("vbs_session={}; vbs_role=Teacher", token(&[])));
        assert_eq!(check("/teacher", &h), Access::Authorized);
    }

    #[test]
    fn redirect_carries_next() {
        let response = login_redirect("/login", "/parent/homework");
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/login?next=%2Fparent%2Fhomework"
        );
    }
}
