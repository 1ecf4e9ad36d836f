use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::dtos::IncidentFileDto;
use crate::features::files::repositories::IncidentFileRepository;
use crate::features::incidents::dtos::IncidentWithFilesDto;
use crate::features::incidents::lifecycle::{PermissiveTransitions, TransitionPolicy};
use crate::features::incidents::models::{
    CreateIncident, Incident, IncidentStatus, DESCRIPTION_MAX_LEN, TITLE_MAX_LEN,
};
use crate::features::incidents::repositories::IncidentRepository;

/// Service for incident records and their status lifecycle
pub struct IncidentService {
    incidents: Arc<dyn IncidentRepository>,
    files: Arc<dyn IncidentFileRepository>,
    policy: Arc<dyn TransitionPolicy>,
}

impl IncidentService {
    pub fn new(
        incidents: Arc<dyn IncidentRepository>,
        files: Arc<dyn IncidentFileRepository>,
    ) -> Self {
        Self {
            incidents,
            files,
            policy: Arc::new(PermissiveTransitions),
        }
    }

    /// Replace the status transition policy
    pub fn with_policy(mut self, policy: Arc<dyn TransitionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Trim and bound-check user input
    fn normalize(data: CreateIncident) -> Result<CreateIncident> {
        let title = data.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if title.chars().count() > TITLE_MAX_LEN {
            return Err(AppError::Validation(format!(
                "Title must not exceed {} characters",
                TITLE_MAX_LEN
            )));
        }

        let description = data
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(ref d) = description {
            if d.chars().count() > DESCRIPTION_MAX_LEN {
                return Err(AppError::Validation(format!(
                    "Description must not exceed {} characters",
                    DESCRIPTION_MAX_LEN
                )));
            }
        }

        Ok(CreateIncident {
            title,
            description,
            severity: data.severity,
        })
    }

    /// Create an incident in the initial status
    pub async fn create_incident(&self, data: CreateIncident) -> Result<Incident> {
        let data = Self::normalize(data)?;
        let incident = self.incidents.insert(&data, Utc::now()).await?;

        tracing::info!(
            "Incident created: id={}, severity={}, status={}",
            incident.id,
            incident.severity,
            incident.status
        );

        Ok(incident)
    }

    pub async fn get_incident(&self, id: Uuid) -> Result<Incident> {
        self.incidents
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Incident {} not found", id)))
    }

    /// Incident with its attachments
    pub async fn get_incident_with_files(&self, id: Uuid) -> Result<IncidentWithFilesDto> {
        let incident = self.get_incident(id).await?;
        let files = self.files.list_by_incident(id).await?;

        Ok(IncidentWithFilesDto {
            incident: incident.into(),
            files: files.into_iter().map(IncidentFileDto::from).collect(),
        })
    }

    /// All incidents with their attachments.
    ///
    /// Runs one incident query and one file query, then groups files by
    /// incident id.
    pub async fn list_incidents_with_files(&self) -> Result<Vec<IncidentWithFilesDto>> {
        let incidents = self.incidents.list().await?;
        let files = self.files.list_all().await?;

        let mut by_incident: HashMap<Uuid, Vec<IncidentFileDto>> = HashMap::new();
        for file in files {
            by_incident
                .entry(file.incident_id)
                .or_default()
                .push(file.into());
        }

        Ok(incidents
            .into_iter()
            .map(|incident| {
                let files = by_incident.remove(&incident.id).unwrap_or_default();
                IncidentWithFilesDto {
                    incident: incident.into(),
                    files,
                }
            })
            .collect())
    }

    /// Move an incident to a new status and refresh `updated_at`
    pub async fn update_status(&self, id: Uuid, status: IncidentStatus) -> Result<Incident> {
        let current = self.get_incident(id).await?;

        self.policy
            .check(current.status, status)
            .map_err(AppError::Validation)?;

        let updated = self
            .incidents
            .update_status(id, status, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Incident {} not found", id)))?;

        tracing::info!(
            "Incident {} status changed: {} -> {}",
            id,
            current.status,
            updated.status
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::models::CreateIncidentFile;
    use crate::features::incidents::lifecycle::ForwardOnlyTransitions;
    use crate::features::incidents::models::IncidentSeverity;
    use crate::shared::test_helpers::{InMemoryIncidentFileRepository, InMemoryIncidentRepository};
    use fake::faker::lorem::en::Sentence;
    use fake::Fake;

    fn service() -> (
        IncidentService,
        Arc<InMemoryIncidentRepository>,
        Arc<InMemoryIncidentFileRepository>,
    ) {
        let incidents = Arc::new(InMemoryIncidentRepository::default());
        let files = Arc::new(InMemoryIncidentFileRepository::default());
        (
            IncidentService::new(incidents.clone(), files.clone()),
            incidents,
            files,
        )
    }

    fn new_incident(title: &str) -> CreateIncident {
        CreateIncident {
            title: title.to_string(),
            description: Some("db down".to_string()),
            severity: IncidentSeverity::High,
        }
    }

    async fn attach(files: &InMemoryIncidentFileRepository, incident_id: Uuid, name: &str) {
        files
            .insert(&CreateIncidentFile {
                incident_id,
                file_name: name.to_string(),
                storage_key: format!("{}-{}", incident_id, name),
                file_path: format!("/uploads/{}/{}", incident_id, name),
                content_type: None,
                file_size: 1,
                uploaded_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_sets_initial_status_and_equal_timestamps() {
        let (service, _, _) = service();
        let title: String = Sentence(1..4).fake();
        let title: String = title.chars().take(TITLE_MAX_LEN).collect();

        let incident = service.create_incident(new_incident(&title)).await.unwrap();

        assert_eq!(incident.status, IncidentStatus::Open);
        assert_eq!(incident.created_at, incident.updated_at);
        assert_eq!(incident.severity, IncidentSeverity::High);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title_and_persists_nothing() {
        let (service, incidents, _) = service();

        for title in ["", "   "] {
            let err = service.create_incident(new_incident(title)).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert_eq!(incidents.count(), 0);
    }

    #[tokio::test]
    async fn test_create_enforces_length_bounds() {
        let (service, incidents, _) = service();

        assert!(service
            .create_incident(new_incident(&"t".repeat(TITLE_MAX_LEN)))
            .await
            .is_ok());
        assert!(matches!(
            service
                .create_incident(new_incident(&"t".repeat(TITLE_MAX_LEN + 1)))
                .await,
            Err(AppError::Validation(_))
        ));

        let mut long_description = new_incident("Outage");
        long_description.description = Some("d".repeat(DESCRIPTION_MAX_LEN + 1));
        assert!(matches!(
            service.create_incident(long_description).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(incidents.count(), 1);
    }

    #[tokio::test]
    async fn test_create_drops_blank_description() {
        let (service, _, _) = service();
        let mut data = new_incident("Outage");
        data.description = Some("  ".to_string());

        let incident = service.create_incident(data).await.unwrap();
        assert!(incident.description.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_incident_is_not_found() {
        let (service, _, _) = service();
        assert!(matches!(
            service.get_incident(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_status_on_missing_incident() {
        let (service, incidents, _) = service();
        service.create_incident(new_incident("Outage")).await.unwrap();

        let err = service
            .update_status(Uuid::new_v4(), IncidentStatus::Resolved)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        let stored = incidents.list().await.unwrap();
        assert_eq!(stored[0].status, IncidentStatus::Open);
    }

    #[tokio::test]
    async fn test_update_status_accepts_every_pair() {
        let (service, _, _) = service();
        let incident = service.create_incident(new_incident("Outage")).await.unwrap();

        let mut previous = incident.updated_at;
        for from in IncidentStatus::ALL {
            for to in IncidentStatus::ALL {
                service.update_status(incident.id, from).await.unwrap();
                let updated = service.update_status(incident.id, to).await.unwrap();
                assert_eq!(updated.status, to);
                assert!(updated.updated_at >= previous);
                previous = updated.updated_at;
            }
        }
    }

    #[tokio::test]
    async fn test_custom_policy_rejects_without_mutation() {
        let (service, _, _) = service();
        let service = service.with_policy(Arc::new(ForwardOnlyTransitions));
        let incident = service.create_incident(new_incident("Outage")).await.unwrap();

        service
            .update_status(incident.id, IncidentStatus::Resolved)
            .await
            .unwrap();
        let err = service
            .update_status(incident.id, IncidentStatus::Open)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(
            service.get_incident(incident.id).await.unwrap().status,
            IncidentStatus::Resolved
        );
    }

    #[tokio::test]
    async fn test_list_with_files_groups_by_incident() {
        let (service, _, files) = service();
        let first = service.create_incident(new_incident("First")).await.unwrap();
        let second = service.create_incident(new_incident("Second")).await.unwrap();
        let third = service.create_incident(new_incident("Third")).await.unwrap();

        attach(&files, first.id, "a.txt").await;
        attach(&files, second.id, "b.txt").await;
        attach(&files, first.id, "c.txt").await;

        let listed = service.list_incidents_with_files().await.unwrap();
        assert_eq!(listed.len(), 3);

        assert_eq!(listed[0].incident.id, first.id);
        let names: Vec<_> = listed[0].files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "c.txt"]);

        assert_eq!(listed[1].incident.id, second.id);
        assert_eq!(listed[1].files.len(), 1);

        assert_eq!(listed[2].incident.id, third.id);
        assert!(listed[2].files.is_empty());
    }

    #[tokio::test]
    async fn test_single_incident_with_files() {
        let (service, _, files) = service();
        let incident = service.create_incident(new_incident("Outage")).await.unwrap();
        attach(&files, incident.id, "trace.log").await;

        let detail = service.get_incident_with_files(incident.id).await.unwrap();
        assert_eq!(detail.files.len(), 1);
        assert_eq!(detail.files[0].file_name, "trace.log");
    }
}
