use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::{NewRegistration, Registration, RegistrationStatus, RegistrationStore, StoreError};
use crate::auth::Role;
use crate::config::DatabaseConfig;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS registrations (
        id              UUID PRIMARY KEY,
        role            TEXT NOT NULL,
        full_name       TEXT NOT NULL,
        email           TEXT NOT NULL,
        phone           TEXT,
        student_number  TEXT,
        note            TEXT,
        status          TEXT NOT NULL DEFAULT 'pending',
        reviewed_by     TEXT,
        created_at      TIMESTAMPTZ NOT NULL,
        updated_at      TIMESTAMPTZ NOT NULL
    )
"#;

const COLUMNS: &str = "id, role, full_name, email, phone, student_number, note, status, reviewed_by, created_at, updated_at";

pub struct PgRegistrationStore {
    pool: PgPool,
}

impl PgRegistrationStore {
    /// Lazily connecting pool; the first query opens the connection.
    pub fn connect_lazy(url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    /// Create the registrations table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        tracing::debug!("registrations table ready");
        Ok(())
    }
}

#[async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn create(&self, new: NewRegistration) -> Result<Registration, StoreError> {
        let registration = new.into_registration(Utc::now());
        let sql = format!(
            "INSERT INTO registrations ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            COLUMNS
        );

        sqlx::query(&sql)
            .bind(registration.id)
            .bind(registration.role.as_str())
            .bind(&registration.full_name)
            .bind(&registration.email)
            .bind(&registration.phone)
            .bind(&registration.student_number)
            .bind(&registration.note)
            .bind(registration.status.as_str())
            .bind(&registration.reviewed_by)
            .bind(registration.created_at)
            .bind(registration.updated_at)
            .execute(&self.pool)
            .await?;

        Ok(registration)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Registration>, StoreError> {
        let sql = format!("SELECT {} FROM registrations WHERE id = $1", COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(registration_from_row).transpose()
    }

    async fn list(&self, status: Option<RegistrationStatus>) -> Result<Vec<Registration>, StoreError> {
        let rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM registrations WHERE status = $1 ORDER BY created_at DESC",
                    COLUMNS
                );
                sqlx::query(&sql)
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {} FROM registrations ORDER BY created_at DESC", COLUMNS);
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
        };

        rows.iter().map(registration_from_row).collect()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: RegistrationStatus,
        reviewer: &str,
    ) -> Result<Registration, StoreError> {
        if status == RegistrationStatus::Pending {
            let current = self.get(id).await?.ok_or(StoreError::NotFound(id))?;
            return Err(StoreError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        // Only pending rows are updated; the WHERE clause makes the review
        // a single atomic step.
        let sql = format!(
            "UPDATE registrations SET status = $2, reviewed_by = $3, updated_at = $4 \
             WHERE id = $1 AND status = 'pending' RETURNING {}",
            COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(reviewer)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => registration_from_row(&row),
            None => match self.get(id).await? {
                Some(current) => Err(StoreError::InvalidTransition {
                    from: current.status,
                    to: status,
                }),
                None => Err(StoreError::NotFound(id)),
            },
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn registration_from_row(row: &PgRow) -> Result<Registration, StoreError> {
    let role: String = row.try_get("role")?;
    let status: String = row.try_get("status")?;

    Ok(Registration {
        id: row.try_get("id")?,
        role: Role::parse(&role).ok_or_else(|| StoreError::Corrupt(format!("unknown role '{}'", role)))?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        student_number: row.try_get("student_number")?,
        note: row.try_get("note")?,
        status: RegistrationStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown status '{}'", status)))?,
        reviewed_by: row.try_get("reviewed_by")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}
