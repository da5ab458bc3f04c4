//! Upstream proxy plumbing shared by every `/api` resource handler.
//!
//! A resource is described once by a [`ProxyEndpoint`]; credential handling,
//! URL construction, body decoding and the response envelope live here so
//! the per-endpoint differences stay visible in the descriptors.

pub mod binary;
pub mod credentials;
pub mod endpoint;
pub mod envelope;

pub use binary::{fetch_file, BinaryEndpoint};
pub use credentials::{normalize, CookieForwarding, Credentials};
pub use endpoint::{FailureMode, NotFoundPolicy, ProxyEndpoint, QueryPolicy};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("missing path parameter '{0}'")]
    MissingParam(String),

    #[error("path parameter '{0}' is not a usable segment")]
    InvalidParam(String),

    #[error("base URL '{0}' cannot carry a path")]
    BaseUrl(String),

    #[error("invalid file URL '{0}'")]
    InvalidFileUrl(String),

    #[error("host '{0}' is not allowed for file proxying")]
    DisallowedHost(String),

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
