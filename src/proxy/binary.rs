use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use reqwest::redirect::Policy;
use url::{ParseError, Url};

use super::credentials::{normalize, CookieForwarding};
use super::endpoint::{ProxyEndpoint, QueryPolicy};
use super::envelope::{apply_no_store, json_response};
use super::ProxyError;
use crate::config::UpstreamConfig;
use crate::error::{ApiError, SERVER_ERROR_MESSAGE};
use crate::state::AppState;

const MAX_FILE_REDIRECTS: usize = 5;

/// A download whose bytes are streamed back untouched.
#[derive(Debug, Clone, Copy)]
pub struct BinaryEndpoint {
    pub name: &'static str,
    pub upstream: &'static str,
    /// Filename offered when the upstream sends no `Content-Disposition`.
    /// `{param}` placeholders are filled from route parameters.
    pub filename: &'static str,
    pub cookies: CookieForwarding,
}

impl BinaryEndpoint {
    pub async fn download(&self, state: &AppState, params: &[(&str, String)], headers: &HeaderMap) -> Response {
        let template = ProxyEndpoint {
            name: self.name,
            upstream: self.upstream,
            query: QueryPolicy::Drop,
            ..ProxyEndpoint::DEFAULTS
        };

        let url = match template.resolve_url(&state.config.upstream.base_url, params, &[]) {
            Ok(url) => url,
            Err(e) => return ApiError::bad_request(e.to_string()).into_response_with_no_store(),
        };

        let disposition = format!(
            "attachment; filename=\"{}\"",
            sanitize_filename(&fill(self.filename, params))
        );

        stream_upstream(&state.client, state, self.name, url, headers, self.cookies, Some(disposition)).await
    }
}

/// Fetch a photo or document on the caller's behalf (`GET /api/files?url=`).
pub async fn fetch_file(state: &AppState, headers: &HeaderMap, raw_url: Option<&str>) -> Response {
    let url = match raw_url
        .ok_or_else(|| ProxyError::MissingParam("url".to_string()))
        .and_then(|raw| resolve_file_url(&state.config.upstream, raw))
    {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("rejected file proxy request: {}", e);
            return ApiError::bad_request("Geçersiz dosya adresi").into_response_with_no_store();
        }
    };

    stream_upstream(&state.file_client, state, "files", url, headers, CookieForwarding::Forward, None).await
}

/// Resolve the `url` parameter of the file proxy.
///
/// Relative references resolve against the backend base URL. Absolute URLs
/// must point at the backend host or one of the configured extra hosts.
pub fn resolve_file_url(upstream: &UpstreamConfig, raw: &str) -> Result<Url, ProxyError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ProxyError::InvalidFileUrl(raw.to_string()));
    }

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => upstream
            .base_url
            .join(raw)
            .map_err(|_| ProxyError::InvalidFileUrl(raw.to_string()))?,
        Err(_) => return Err(ProxyError::InvalidFileUrl(raw.to_string())),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProxyError::InvalidFileUrl(raw.to_string()));
    }

    if !is_allowed_file_host(upstream, &url) {
        return Err(ProxyError::DisallowedHost(url.host_str().unwrap_or_default().to_string()));
    }

    Ok(url)
}

/// Backend host or one of the configured extra hosts, over http(s).
pub fn is_allowed_file_host(upstream: &UpstreamConfig, url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let host = url.host_str().unwrap_or_default();
    upstream
        .base_url
        .host_str()
        .into_iter()
        .chain(upstream.file_allowed_hosts.iter().map(String::as_str))
        .any(|candidate| candidate.eq_ignore_ascii_case(host))
}

/// Redirects are followed only while they stay on allowed file hosts.
pub fn file_redirect_policy(upstream: &UpstreamConfig) -> Policy {
    let upstream = upstream.clone();
    Policy::custom(move |attempt| {
        if !is_allowed_file_host(&upstream, attempt.url()) {
            let target = attempt.url().to_string();
            tracing::warn!(target = %target, "file redirect left the allowed hosts");
            attempt.error(ProxyError::DisallowedHost(target))
        } else if attempt.previous().len() >= MAX_FILE_REDIRECTS {
            attempt.error(ProxyError::InvalidFileUrl("too many redirects".to_string()))
        } else {
            attempt.follow()
        }
    })
}

async fn stream_upstream(
    client: &reqwest::Client,
    state: &AppState,
    name: &str,
    url: Url,
    headers: &HeaderMap,
    cookies: CookieForwarding,
    default_disposition: Option<String>,
) -> Response {
    let credentials = normalize(headers, &state.config.session.cookie_names, cookies);
    let request = credentials.apply(client.get(url.clone()));

    tracing::debug!(endpoint = name, url = %url, "fetching binary upstream");

    let upstream = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(endpoint = name, "binary upstream call failed: {}", e);
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": SERVER_ERROR_MESSAGE }),
                None,
            );
        }
    };

    let status = upstream.status();
    if !status.is_success() {
        let text = upstream.text().await.unwrap_or_default();
        tracing::warn!(endpoint = name, %status, "binary upstream returned error");
        let mut response = (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text,
        )
            .into_response();
        apply_no_store(response.headers_mut());
        return response;
    }

    let upstream_headers = upstream.headers().clone();
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;

    let out = response.headers_mut();
    out.insert(
        header::CONTENT_TYPE,
        upstream_headers
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream")),
    );
    if let Some(length) = upstream_headers.get(header::CONTENT_LENGTH) {
        out.insert(header::CONTENT_LENGTH, length.clone());
    }
    match upstream_headers.get(header::CONTENT_DISPOSITION) {
        Some(disposition) => {
            out.insert(header::CONTENT_DISPOSITION, disposition.clone());
        }
        None => {
            if let Some(value) = default_disposition.and_then(|d| HeaderValue::from_str(&d).ok()) {
                out.insert(header::CONTENT_DISPOSITION, value);
            }
        }
    }
    apply_no_store(out);

    response
}

fn fill(template: &str, params: &[(&str, String)]) -> String {
    params.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || "._-".contains(c) { c } else { '_' })
        .collect()
}
