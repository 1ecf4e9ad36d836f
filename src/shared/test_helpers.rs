//! In-memory repositories for service and handler tests

#![cfg(test)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{CreateIncidentFile, IncidentFile};
use crate::features::files::repositories::IncidentFileRepository;
use crate::features::incidents::models::{CreateIncident, Incident, IncidentStatus};
use crate::features::incidents::repositories::IncidentRepository;

#[derive(Default)]
pub struct InMemoryIncidentRepository {
    rows: Mutex<Vec<Incident>>,
}

impl InMemoryIncidentRepository {
    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl IncidentRepository for InMemoryIncidentRepository {
    async fn insert(&self, data: &CreateIncident, now: DateTime<Utc>) -> Result<Incident> {
        let incident = Incident {
            id: Uuid::new_v4(),
            title: data.title.clone(),
            description: data.description.clone(),
            severity: data.severity,
            status: IncidentStatus::INITIAL,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(incident.clone());
        Ok(incident)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Incident>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Incident>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: IncidentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Incident>> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.iter_mut().find(|i| i.id == id).map(|incident| {
            incident.status = status;
            incident.updated_at = incident.updated_at.max(now);
            incident.clone()
        }))
    }
}

#[derive(Default)]
pub struct InMemoryIncidentFileRepository {
    rows: Mutex<Vec<IncidentFile>>,
    fail_inserts: AtomicBool,
}

impl InMemoryIncidentFileRepository {
    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Make subsequent inserts fail like a lost database connection
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl IncidentFileRepository for InMemoryIncidentFileRepository {
    async fn insert(&self, data: &CreateIncidentFile) -> Result<IncidentFile> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Internal("insert failed".to_string()));
        }

        let file = IncidentFile {
            id: Uuid::new_v4(),
            incident_id: data.incident_id,
            file_name: data.file_name.clone(),
            storage_key: data.storage_key.clone(),
            file_path: data.file_path.clone(),
            content_type: data.content_type.clone(),
            file_size: data.file_size,
            uploaded_at: data.uploaded_at,
        };
        self.rows.lock().unwrap().push(file.clone());
        Ok(file)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.rows.lock().unwrap().retain(|f| f.id != id);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IncidentFile>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == id)
            .cloned())
    }

    async fn list_by_incident(&self, incident_id: Uuid) -> Result<Vec<IncidentFile>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.incident_id == incident_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<IncidentFile>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn exists_by_storage_key(&self, storage_key: &str) -> Result<bool> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .any(|f| f.storage_key == storage_key))
    }
}
