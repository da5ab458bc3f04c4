//! Parent and teacher sign-up applications awaiting admin review.

pub mod memory;
pub mod postgres;

pub use memory::MemoryRegistrationStore;
pub use postgres::PgRegistrationStore;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(RegistrationStatus::Pending),
            "approved" => Some(RegistrationStatus::Approved),
            "rejected" => Some(RegistrationStatus::Rejected),
            _ => None,
        }
    }

    /// Applications are reviewed once: pending → approved | rejected.
    pub fn can_transition_to(&self, next: RegistrationStatus) -> bool {
        *self == RegistrationStatus::Pending && next != RegistrationStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Uuid,
    pub role: Role,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub student_number: Option<String>,
    pub note: Option<String>,
    pub status: RegistrationStatus,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated application ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRegistration {
    pub role: Role,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub student_number: Option<String>,
    pub note: Option<String>,
}

impl NewRegistration {
    pub fn into_registration(self, now: DateTime<Utc>) -> Registration {
        Registration {
            id: Uuid::new_v4(),
            role: self.role,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            student_number: self.student_number,
            note: self.note,
            status: RegistrationStatus::Pending,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `POST /api/registrations`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub student_number: Option<String>,
    pub note: Option<String>,
}

impl RegistrationRequest {
    /// Check the application; failures are reported per field.
    pub fn validate(self) -> Result<NewRegistration, HashMap<String, String>> {
        let mut errors = HashMap::new();

        let role = match Role::parse(&self.role) {
            Some(role @ (Role::Parent | Role::Teacher)) => Some(role),
            _ => {
                errors.insert("role".to_string(), "Parent veya Teacher olmalı".to_string());
                None
            }
        };

        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            errors.insert("fullName".to_string(), "Zorunlu alan".to_string());
        }

        let email = self.email.trim().to_ascii_lowercase();
        if !looks_like_email(&email) {
            errors.insert("email".to_string(), "Geçerli bir e-posta adresi girin".to_string());
        }

        let student_number = non_empty(self.student_number);
        if role == Some(Role::Parent) && student_number.is_none() {
            errors.insert("studentNumber".to_string(), "Veli başvurularında zorunlu".to_string());
        }

        match role {
            Some(role) if errors.is_empty() => Ok(NewRegistration {
                role,
                full_name,
                email,
                phone: non_empty(self.phone),
                student_number,
                note: non_empty(self.note),
            }),
            _ => Err(errors),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("registration {0} not found")]
    NotFound(Uuid),

    #[error("cannot move registration from {from:?} to {to:?}")]
    InvalidTransition {
        from: RegistrationStatus,
        to: RegistrationStatus,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt registration row: {0}")]
    Corrupt(String),
}

/// Persistence for registration applications.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn create(&self, new: NewRegistration) -> Result<Registration, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Registration>, StoreError>;

    /// Newest first, optionally filtered by status.
    async fn list(&self, status: Option<RegistrationStatus>) -> Result<Vec<Registration>, StoreError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: RegistrationStatus,
        reviewer: &str,
    ) -> Result<Registration, StoreError>;

    /// Liveness check used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}
