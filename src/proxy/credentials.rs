use axum::http::{header, HeaderMap, HeaderValue};

use crate::auth::cookies::{first_cookie, raw_cookie_header};

/// Whether the raw inbound `Cookie` header travels upstream next to the
/// bearer token. Some backend routes reject the combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieForwarding {
    Forward,
    Omit,
}

/// Outbound credential headers for one upstream call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub authorization: Option<HeaderValue>,
    pub cookie: Option<HeaderValue>,
}

impl Credentials {
    pub fn apply(self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(authorization) = self.authorization {
            request = request.header(header::AUTHORIZATION, authorization);
        }
        if let Some(cookie) = self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        request
    }
}

/// Decide which credentials accompany an upstream call.
///
/// An inbound bearer header wins and is sent verbatim. Otherwise the first
/// session cookie found in `cookie_names` becomes `Bearer <token>`. The raw
/// cookie header is forwarded independently when `forwarding` allows it.
pub fn normalize<S: AsRef<str>>(
    headers: &HeaderMap,
    cookie_names: &[S],
    forwarding: CookieForwarding,
) -> Credentials {
    let authorization = inbound_bearer(headers).or_else(|| {
        first_cookie(headers, cookie_names)
            .and_then(|token| HeaderValue::from_str(&format!("Bearer {}", token)).ok())
    });

    let cookie = match forwarding {
        CookieForwarding::Forward => raw_cookie_header(headers),
        CookieForwarding::Omit => None,
    };

    Credentials {
        authorization,
        cookie,
    }
}

/// The inbound `Authorization` header, if it is a bearer credential.
pub fn inbound_bearer(headers: &HeaderMap) -> Option<HeaderValue> {
    let value = headers.get(header::AUTHORIZATION)?;
    let text = value.to_str().ok()?;
    let is_bearer = text
        .get(..7)
        .map(|prefix| prefix.eq_ignore_ascii_case("bearer "))
        .unwrap_or(false);

    is_bearer.then(|| value.clone())
}

/// The raw token carried by a bearer header or, failing that, a session cookie.
pub fn session_token<S: AsRef<str>>(headers: &HeaderMap, cookie_names: &[S]) -> Option<String> {
    inbound_bearer(headers)
        .and_then(|value| value.to_str().ok().map(|v| v[7..].trim().to_string()))
        .filter(|token| !token.is_empty())
        .or_else(|| first_cookie(headers, cookie_names))
}
