use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewRegistration, Registration, RegistrationStatus, RegistrationStore, StoreError};

/// In-memory store for development and tests.
///
/// Owned by the application state of a single server instance; nothing
/// survives a restart.
#[derive(Default)]
pub struct MemoryRegistrationStore {
    records: RwLock<HashMap<Uuid, Registration>>,
}

impl MemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationStore for MemoryRegistrationStore {
    async fn create(&self, new: NewRegistration) -> Result<Registration, StoreError> {
        let registration = new.into_registration(Utc::now());
        self.records
            .write()
            .await
            .insert(registration.id, registration.clone());
        Ok(registration)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Registration>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self, status: Option<RegistrationStatus>) -> Result<Vec<Registration>, StoreError> {
        let records = self.records.read().await;
        let mut matching: Vec<Registration> = records
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: RegistrationStatus,
        reviewer: &str,
    ) -> Result<Registration, StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if !record.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: record.status,
                to: status,
            });
        }

        record.status = status;
        record.reviewed_by = Some(reviewer.to_string());
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
