use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration failures are fatal: the server refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub session: SessionConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub public_dir: String,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: Url,
    pub timeout_secs: u64,
    /// Extra hosts the file proxy may fetch from besides the backend host.
    pub file_allowed_hosts: Vec<String>,
}

#[derive(Clone)]
pub struct SessionConfig {
    pub jwt_secret: String,
    /// Session cookie names in priority order; the first is the one we issue.
    pub cookie_names: Vec<String>,
    pub role_cookie: String,
    pub login_path: String,
    pub cookie_max_age_secs: i64,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub require_https: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("jwt_secret", &"<redacted>")
            .field("cookie_names", &self.cookie_names)
            .field("role_cookie", &self.role_cookie)
            .field("login_path", &self.login_path)
            .field("cookie_max_age_secs", &self.cookie_max_age_secs)
            .finish()
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SessionConfig {
    /// Name of the cookie the gateway writes on login.
    pub fn primary_cookie(&self) -> &str {
        self.cookie_names
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_SESSION_COOKIE)
    }
}

pub const DEFAULT_SESSION_COOKIE: &str = "vbs_session";
pub const LEGACY_SESSION_COOKIE: &str = "authToken";
pub const DEFAULT_ROLE_COOKIE: &str = "vbs_role";

const BASE_URL_VAR: &str = "API_BASE_URL";
const PUBLIC_BASE_URL_VAR: &str = "NEXT_PUBLIC_API_BASE_URL";
const SECRET_VAR: &str = "JWT_SECRET";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match get("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let raw_base = get(BASE_URL_VAR)
            .or_else(|| get(PUBLIC_BASE_URL_VAR))
            .ok_or(ConfigError::Missing(BASE_URL_VAR))?;
        let base_url = parse_base_url(&raw_base)?;

        let jwt_secret = get(SECRET_VAR).ok_or(ConfigError::Missing(SECRET_VAR))?;

        let preset = match environment {
            Environment::Production => Self::production(base_url, jwt_secret),
            Environment::Staging => Self::staging(base_url, jwt_secret),
            Environment::Development => Self::development(base_url, jwt_secret),
        };

        preset.with_overrides(get)
    }

    fn with_overrides<F>(mut self, get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = get("VBS_PORT").or_else(|| get("PORT")) {
            self.server.port = v.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                reason: format!("'{}' is not a port number", v),
            })?;
        }
        if let Some(v) = get("PUBLIC_DIR") {
            self.server.public_dir = v;
        }

        // Upstream overrides
        if let Some(v) = get("UPSTREAM_TIMEOUT_SECS") {
            self.upstream.timeout_secs = v.parse().unwrap_or(self.upstream.timeout_secs);
        }
        if let Some(v) = get("FILE_PROXY_ALLOWED_HOSTS") {
            self.upstream.file_allowed_hosts = split_list(&v);
        }

        // Session overrides
        if let Some(v) = get("SESSION_COOKIE_NAMES") {
            let names = split_list(&v);
            if names.is_empty() {
                return Err(ConfigError::Invalid {
                    name: "SESSION_COOKIE_NAMES",
                    reason: "at least one cookie name is required".to_string(),
                });
            }
            self.session.cookie_names = names;
        }
        if let Some(v) = get("ROLE_COOKIE_NAME") {
            self.session.role_cookie = v;
        }
        if let Some(v) = get("LOGIN_PATH") {
            if !v.starts_with('/') {
                return Err(ConfigError::Invalid {
                    name: "LOGIN_PATH",
                    reason: "must start with '/'".to_string(),
                });
            }
            self.session.login_path = v;
        }
        if let Some(v) = get("SESSION_COOKIE_MAX_AGE_SECS") {
            self.session.cookie_max_age_secs = v.parse().unwrap_or(self.session.cookie_max_age_secs);
        }

        // API overrides
        if let Some(v) = get("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Some(v) = get("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }
        if let Some(v) = get("SECURITY_REQUIRE_HTTPS") {
            self.security.require_https = v.parse().unwrap_or(self.security.require_https);
        }

        // Database overrides
        if let Some(v) = get("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = get("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }

        Ok(self)
    }

    fn development(base_url: Url, jwt_secret: String) -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                public_dir: "public".to_string(),
            },
            upstream: UpstreamConfig {
                base_url,
                timeout_secs: 30,
                file_allowed_hosts: Vec::new(),
            },
            session: default_session(jwt_secret),
            api: ApiConfig {
                max_request_size_bytes: 20 * 1024 * 1024, // 20MB
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string()],
                require_https: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
            },
        }
    }

    fn staging(base_url: Url, jwt_secret: String) -> Self {
        let mut config = Self::development(base_url, jwt_secret);
        config.environment = Environment::Staging;
        config.upstream.timeout_secs = 20;
        config.security.cors_origins = Vec::new();
        config.security.require_https = true;
        config.database.max_connections = 10;
        config
    }

    fn production(base_url: Url, jwt_secret: String) -> Self {
        let mut config = Self::development(base_url, jwt_secret);
        config.environment = Environment::Production;
        config.upstream.timeout_secs = 15;
        config.api.max_request_size_bytes = 10 * 1024 * 1024; // 10MB
        config.security.cors_origins = Vec::new();
        config.security.require_https = true;
        config.database.max_connections = 20;
        config
    }

    pub fn is_development(&self) -> bool {
        matches!(self.environment, Environment::Development)
    }
}

fn default_session(jwt_secret: String) -> SessionConfig {
    SessionConfig {
        jwt_secret,
        cookie_names: vec![
            DEFAULT_SESSION_COOKIE.to_string(),
            LEGACY_SESSION_COOKIE.to_string(),
        ],
        role_cookie: DEFAULT_ROLE_COOKIE.to_string(),
        login_path: "/login".to_string(),
        cookie_max_age_secs: 60 * 60 * 24 * 7,
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name: BASE_URL_VAR,
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid {
            name: BASE_URL_VAR,
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
