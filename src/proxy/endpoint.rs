use axum::{
    body::to_bytes,
    extract::Request,
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode},
    response::Response,
};
use serde_json::{json, Value};
use url::Url;

use super::credentials::{normalize, CookieForwarding};
use super::envelope::{decode_body, empty_response, json_response, upstream_error_message};
use super::ProxyError;
use crate::error::{ApiError, SERVER_ERROR_MESSAGE};
use crate::state::AppState;

/// Which inbound query parameters reach the upstream URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPolicy {
    /// Every inbound parameter.
    All,
    /// Every parameter except those consumed by the path template.
    ExcludeConsumed,
    /// Only the listed parameters.
    Only(&'static [&'static str]),
    /// None at all.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    Propagate,
    /// Upstream 404 means "no data yet": answer 200 with `{ "items": [] }`.
    EmptyCollection,
}

/// What the client sees when the upstream answers with an error status.
#[derive(Debug, Clone, Copy)]
pub enum FailureMode {
    Passthrough,
    /// Soft-fail: status 200, the endpoint's fallback payload plus `error`.
    SoftFail(fn() -> Value),
}

/// Static description of one proxied resource.
#[derive(Debug, Clone, Copy)]
pub struct ProxyEndpoint {
    /// Used in logs only.
    pub name: &'static str,
    /// Upstream path; whole segments of the form `{param}` are substituted.
    pub upstream: &'static str,
    pub query: QueryPolicy,
    /// Route parameters appended to the upstream query string.
    pub params_as_query: &'static [&'static str],
    pub cookies: CookieForwarding,
    pub not_found: NotFoundPolicy,
    pub failure: FailureMode,
    /// Body returned (200, no upstream call) when a template parameter is missing.
    pub missing_param: Option<fn() -> Value>,
    /// Message for transport failures.
    pub error_message: &'static str,
}

impl ProxyEndpoint {
    pub const DEFAULTS: ProxyEndpoint = ProxyEndpoint {
        name: "",
        upstream: "/",
        query: QueryPolicy::All,
        params_as_query: &[],
        cookies: CookieForwarding::Forward,
        not_found: NotFoundPolicy::Propagate,
        failure: FailureMode::Passthrough,
        missing_param: None,
        error_message: SERVER_ERROR_MESSAGE,
    };

    /// Proxy `req` upstream and shape the answer for the browser.
    pub async fn forward(&self, state: &AppState, params: &[(&str, String)], req: Request) -> Response {
        let (parts, body) = req.into_parts();
        let query = inbound_query(&parts);

        let url = match self.resolve_url(&state.config.upstream.base_url, params, &query) {
            Ok(url) => url,
            Err(ProxyError::MissingParam(param)) => return self.missing_param_response(&param),
            Err(e @ ProxyError::InvalidParam(_)) => {
                tracing::warn!(endpoint = self.name, "rejected path parameter: {}", e);
                return ApiError::bad_request("Geçersiz parametre").into_response_with_no_store();
            }
            Err(e) => return self.failure_response(e),
        };

        let body = match to_bytes(body, state.config.api.max_request_size_bytes).await {
            Ok(bytes) => bytes,
            Err(e) if exceeds_length_limit(&e) => {
                tracing::warn!(endpoint = self.name, "request body over the configured limit");
                return ApiError::payload_too_large("İstek gövdesi çok büyük").into_response_with_no_store();
            }
            Err(e) => {
                tracing::warn!(endpoint = self.name, "failed to read request body: {}", e);
                return ApiError::bad_request("İstek gövdesi okunamadı").into_response_with_no_store();
            }
        };

        let credentials = normalize(&parts.headers, &state.config.session.cookie_names, self.cookies);
        let mut outbound = credentials
            .apply(state.client.request(parts.method.clone(), url.clone()))
            .header(header::ACCEPT, "application/json");

        if !body.is_empty() || has_write_semantics(&parts.method) {
            outbound = outbound.header(header::CONTENT_TYPE, outbound_content_type(&parts.headers));
        }
        if !body.is_empty() {
            outbound = outbound.body(body);
        }

        tracing::debug!(endpoint = self.name, method = %parts.method, url = %url, "forwarding upstream");

        let upstream = match outbound.send().await {
            Ok(response) => response,
            Err(e) => return self.failure_response(ProxyError::Transport(e)),
        };

        let status = upstream.status();
        let retry_after = upstream.headers().get(header::RETRY_AFTER).cloned();
        let bytes = match upstream.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return self.failure_response(ProxyError::Transport(e)),
        };

        if status.is_server_error() {
            tracing::warn!(endpoint = self.name, %status, "upstream returned server error");
        }

        self.shape(status, retry_after, &bytes)
    }

    /// Build the upstream URL from the template, route parameters and query.
    pub fn resolve_url(
        &self,
        base: &Url,
        params: &[(&str, String)],
        query: &[(String, String)],
    ) -> Result<Url, ProxyError> {
        let lookup = |name: &str| -> Option<String> {
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.clone())
                .or_else(|| {
                    query
                        .iter()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| value.clone())
                })
                .filter(|value| !value.trim().is_empty())
        };

        let mut segments = Vec::new();
        let mut consumed = Vec::new();
        for segment in self.upstream.split('/').filter(|s| !s.is_empty()) {
            match placeholder(segment) {
                Some(name) => {
                    let value = lookup(name).ok_or_else(|| ProxyError::MissingParam(name.to_string()))?;
                    if is_dot_segment(&value) {
                        return Err(ProxyError::InvalidParam(name.to_string()));
                    }
                    consumed.push(name);
                    segments.push(value);
                }
                None => segments.push(segment.to_string()),
            }
        }

        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| ProxyError::BaseUrl(base.to_string()))?
            .pop_if_empty()
            .extend(segments.iter());

        let passthrough: Vec<&(String, String)> = query
            .iter()
            .filter(|(key, _)| match self.query {
                QueryPolicy::All => true,
                QueryPolicy::ExcludeConsumed => !consumed.contains(&key.as_str()),
                QueryPolicy::Only(allowed) => allowed.contains(&key.as_str()),
                QueryPolicy::Drop => false,
            })
            .collect();

        let promoted: Vec<(&str, String)> = self
            .params_as_query
            .iter()
            .filter_map(|name| lookup(*name).map(|value| (*name, value)))
            .collect();

        if !passthrough.is_empty() || !promoted.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in passthrough {
                pairs.append_pair(key, value);
            }
            for (key, value) in &promoted {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Turn an upstream status and body into the browser-facing response.
    pub fn shape(&self, status: StatusCode, retry_after: Option<HeaderValue>, body: &[u8]) -> Response {
        if status == StatusCode::NOT_FOUND && self.not_found == NotFoundPolicy::EmptyCollection {
            return json_response(StatusCode::OK, json!({ "items": [] }), retry_after);
        }

        if status.is_client_error() || status.is_server_error() {
            if let FailureMode::SoftFail(fallback) = self.failure {
                let decoded = decode_body(body);
                let message = upstream_error_message(&decoded)
                    .unwrap_or_else(|| self.error_message.to_string());
                let mut payload = fallback();
                match payload.as_object_mut() {
                    Some(map) => {
                        map.insert("error".to_string(), Value::String(message));
                    }
                    None => payload = json!({ "error": message }),
                }
                return json_response(StatusCode::OK, payload, retry_after);
            }
        }

        if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
            return empty_response(status, retry_after);
        }

        json_response(status, decode_body(body), retry_after)
    }

    fn missing_param_response(&self, param: &str) -> Response {
        match self.missing_param {
            Some(fallback) => json_response(StatusCode::OK, fallback(), None),
            None => ApiError::bad_request(format!("'{}' parametresi gerekli", param))
                .into_response_with_no_store(),
        }
    }

    fn failure_response(&self, err: ProxyError) -> Response {
        tracing::error!(endpoint = self.name, "upstream call failed: {}", err);
        json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": self.error_message }),
            None,
        )
    }
}

fn placeholder(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

/// Values the url crate would treat as `.` or `..` and collapse.
fn is_dot_segment(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    matches!(
        lowered.as_str(),
        "." | "%2e" | ".." | ".%2e" | "%2e." | "%2e%2e"
    )
}

fn exceeds_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(current) = source {
        if current.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        source = current.source();
    }
    false
}

fn has_write_semantics(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Inbound `Content-Type` (multipart boundary included) or JSON.
pub(crate) fn outbound_content_type(headers: &HeaderMap) -> HeaderValue {
    headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"))
}

pub(crate) fn inbound_query(parts: &Parts) -> Vec<(String, String)> {
    parts
        .uri
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    const EXAM_ITEM: ProxyEndpoint = ProxyEndpoint {
        name: "exam",
        upstream: "/api/exams/{id}",
        ..ProxyEndpoint::DEFAULTS
    };

    fn base() -> Url {
        Url::parse("http://backend:8080").unwrap()
    }

    fn q(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn substitutes_path_params_and_passes_query() {
        let url = EXAM_ITEM
            .resolve_url(&base(), &[("id", "17".to_string())], &q(&[("include", "questions")]))
            .unwrap();
        assert_eq!(url.as_str(), "http://backend:8080/api/exams/17?include=questions");
    }

    #[test]
    fn path_params_are_percent_encoded() {
        let url = EXAM_ITEM
            .resolve_url(&base(), &[("id", "a/b c".to_string())], &[])
            .unwrap();
        assert_eq!(url.path(), "/api/exams/a%2Fb%20c");
    }

    #[test]
    fn dot_segment_params_are_rejected() {
        for value in ["..", ".", "%2E%2e", ".%2e", " .. "] {
            let err = EXAM_ITEM
                .resolve_url(&base(), &[("id", value.to_string())], &[])
                .unwrap_err();
            assert!(matches!(err, ProxyError::InvalidParam(ref p) if p == "id"), "{:?}", value);
        }
        let url = EXAM_ITEM
            .resolve_url(&base(), &[("id", "...".to_string())], &[])
            .unwrap();
        assert_eq!(url.path(), "/api/exams/...");
    }

    #[tokio::test]
    async fn oversized_body_is_detected_as_length_limit() {
        let body = axum::body::Body::from(vec![b'x'; 64]);
        let err = to_bytes(body, 16).await.unwrap_err();
        assert!(exceeds_length_limit(&err));
    }

    #[test]
    fn keeps_base_path_prefix() {
        let base = Url::parse("http://backend:8080/v1/").unwrap();
        let url = EXAM_ITEM
            .resolve_url(&base, &[("id", "3".to_string())], &[])
            .unwrap();
        assert_eq!(url.as_str(), "http://backend:8080/v1/api/exams/3");
    }

    #[test]
    fn exclude_consumed_drops_template_query_param() {
        let endpoint = ProxyEndpoint {
            upstream: "/api/attendance/students/{studentId}/stats",
            query: QueryPolicy::ExcludeConsumed,
            ..ProxyEndpoint::DEFAULTS
        };
        let url = endpoint
            .resolve_url(&base(), &[], &q(&[("studentId", "9"), ("term", "2")]))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://backend:8080/api/attendance/students/9/stats?term=2"
        );
    }

    #[test]
    fn only_policy_whitelists() {
        let endpoint = ProxyEndpoint {
            upstream: "/api/reports",
            query: QueryPolicy::Only(&["classId"]),
            ..ProxyEndpoint::DEFAULTS
        };
        let url = endpoint
            .resolve_url(&base(), &[], &q(&[("classId", "5"), ("debug", "1")]))
            .unwrap();
        assert_eq!(url.query(), Some("classId=5"));
    }

    #[test]
    fn promotes_route_param_to_query() {
        let endpoint = ProxyEndpoint {
            upstream: "/api/exams/delete",
            params_as_query: &["id"],
            ..ProxyEndpoint::DEFAULTS
        };
        let url = endpoint
            .resolve_url(&base(), &[("id", "44".to_string())], &[])
            .unwrap();
        assert_eq!(url.as_str(), "http://backend:8080/api/exams/delete?id=44");
    }

    #[test]
    fn missing_param_is_reported() {
        let err = EXAM_ITEM.resolve_url(&base(), &[], &[]).unwrap_err();
        assert!(matches!(err, ProxyError::MissingParam(ref p) if p == "id"));
    }

    #[tokio::test]
    async fn shape_passes_status_and_body() {
        let response = EXAM_ITEM.shape(StatusCode::CREATED, None, br#"{"id":1}"#);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await, json!({"id": 1}));
    }

    #[tokio::test]
    async fn shape_passes_error_status_by_default() {
        let response = EXAM_ITEM.shape(StatusCode::FORBIDDEN, None, b"nope");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await, json!({"message": "nope"}));
    }

    #[tokio::test]
    async fn shape_empty_collection_on_404() {
        let endpoint = ProxyEndpoint {
            not_found: NotFoundPolicy::EmptyCollection,
            ..EXAM_ITEM
        };
        let response = endpoint.shape(StatusCode::NOT_FOUND, None, b"");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"items": []}));
    }

    #[tokio::test]
    async fn shape_soft_fail_embeds_error() {
        let endpoint = ProxyEndpoint {
            failure: FailureMode::SoftFail(|| json!({ "analysis": null })),
            ..EXAM_ITEM
        };
        let response = endpoint.shape(
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
            r#"{"message":"analiz hazır değil"}"#.as_bytes(),
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"analysis": null, "error": "analiz hazır değil"})
        );
    }

    #[tokio::test]
    async fn shape_soft_fail_uses_endpoint_message_without_upstream_text() {
        let endpoint = ProxyEndpoint {
            failure: FailureMode::SoftFail(|| json!({ "items": [] })),
            error_message: "Bildirimler alınamadı",
            ..EXAM_ITEM
        };
        let response = endpoint.shape(StatusCode::BAD_GATEWAY, None, b"");
        assert_eq!(
            body_json(response).await,
            json!({"items": [], "error": "Bildirimler alınamadı"})
        );
    }

    #[test]
    fn shape_no_content_has_no_body_but_headers() {
        let response = EXAM_ITEM.shape(StatusCode::NO_CONTENT, None, b"");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(header::CACHE_CONTROL));
    }
}
