use std::collections::BTreeSet;
use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod cookies;

/// The closed set of portal roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Parent,
    Teacher,
    Admin,
}

impl Role {
    /// Case-insensitive parse; unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "parent" => Some(Role::Parent),
            "teacher" => Some(Role::Teacher),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "Parent",
            Role::Teacher => "Teacher",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type RoleSet = BTreeSet<Role>;

/// Roles may be issued as a single string or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleClaim {
    One(String),
    Many(Vec<String>),
}

impl Default for RoleClaim {
    fn default() -> Self {
        RoleClaim::Many(Vec::new())
    }
}

impl RoleClaim {
    pub fn to_set(&self) -> RoleSet {
        match self {
            RoleClaim::One(raw) => parse_role_list(raw),
            RoleClaim::Many(list) => list.iter().filter_map(|r| Role::parse(r)).collect(),
        }
    }
}

/// Parse a comma separated role list, as found in the legacy role cookie.
pub fn parse_role_list(raw: &str) -> RoleSet {
    raw.split(',').filter_map(Role::parse).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "role")]
    pub roles: RoleClaim,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Claims {
    pub fn new(sub: impl Into<String>, roles: &[Role], ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.into(),
            email: None,
            name: None,
            roles: RoleClaim::Many(roles.iter().map(|r| r.as_str().to_string()).collect()),
            exp: (now + ttl).timestamp(),
            iat: Some(now.timestamp()),
        }
    }

    pub fn role_set(&self) -> RoleSet {
        self.roles.to_set()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
#[error("failed to sign session token: {0}")]
pub struct SignError(#[from] jsonwebtoken::errors::Error);

/// Validates HS256 session tokens against the shared secret.
#[derive(Clone)]
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token.trim(), &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        Ok(data.claims)
    }
}

/// Mints session tokens. The backend normally issues them; the gateway only
/// signs for operator tooling and tests.
#[derive(Clone)]
pub struct SessionSigner {
    key: EncodingKey,
}

impl SessionSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, SignError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.key)?)
    }
}
