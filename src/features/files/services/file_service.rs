use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{CreateIncidentFile, IncidentFile, UploadedFile};
use crate::features::files::repositories::IncidentFileRepository;
use crate::features::incidents::repositories::IncidentRepository;
use crate::modules::storage::LocalStorage;
use crate::shared::validation::display_file_name;

/// Outcome of replaying the staging area at startup
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Staged files whose metadata row existed and were moved into place
    pub promoted: usize,
    /// Staged files without a metadata row, removed
    pub discarded: usize,
}

/// Service for incident attachments
pub struct FileService {
    incidents: Arc<dyn IncidentRepository>,
    files: Arc<dyn IncidentFileRepository>,
    storage: Arc<LocalStorage>,
    max_file_size: u64,
}

impl FileService {
    pub fn new(
        incidents: Arc<dyn IncidentRepository>,
        files: Arc<dyn IncidentFileRepository>,
        storage: Arc<LocalStorage>,
        max_file_size: u64,
    ) -> Self {
        Self {
            incidents,
            files,
            storage,
            max_file_size,
        }
    }

    /// Configured maximum attachment size in bytes
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Check size bounds against the bytes actually received
    pub fn validate_size(&self, len: usize) -> Result<()> {
        if len == 0 {
            return Err(AppError::Validation(
                "File size must be larger than 0 bytes".to_string(),
            ));
        }
        if len as u64 > self.max_file_size {
            return Err(AppError::Validation(format!(
                "File size must not exceed {} bytes",
                self.max_file_size
            )));
        }
        Ok(())
    }

    /// Validate a single upload, returning the name to record
    fn validate_upload(&self, file: &UploadedFile) -> Result<String> {
        self.validate_size(file.data.len())?;

        let file_name = display_file_name(&file.file_name);
        if file_name.is_empty() {
            return Err(AppError::Validation("File name is required".to_string()));
        }
        Ok(file_name)
    }

    /// Pre-check a whole batch so nothing is created when any file is invalid
    pub fn validate_batch(&self, files: &[UploadedFile]) -> Result<()> {
        for file in files {
            self.validate_upload(file).map_err(|e| match e {
                AppError::Validation(msg) => {
                    AppError::Validation(format!("{}: {}", file.file_name, msg))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    async fn ensure_incident_exists(&self, incident_id: Uuid) -> Result<()> {
        self.incidents
            .find_by_id(incident_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Incident {} not found", incident_id)))
    }

    /// Store an attachment for an existing incident
    ///
    /// # Arguments
    /// * `incident_id` - The incident the file belongs to
    /// * `file` - The received name, content type and bytes
    ///
    /// # Returns
    /// The recorded attachment metadata
    pub async fn upload_file(&self, incident_id: Uuid, file: UploadedFile) -> Result<IncidentFile> {
        self.ensure_incident_exists(incident_id).await?;
        let file_name = self.validate_upload(&file)?;

        let storage_key = LocalStorage::generate_key(&file_name);
        let file_size = file.data.len() as i64;

        self.storage
            .stage(incident_id, &storage_key, &file.data)
            .await?;

        let record = CreateIncidentFile {
            incident_id,
            file_name,
            file_path: self
                .storage
                .file_path(incident_id, &storage_key)
                .to_string_lossy()
                .into_owned(),
            storage_key,
            content_type: file.content_type,
            file_size,
            uploaded_at: Utc::now(),
        };

        let stored = match self.files.insert(&record).await {
            Ok(stored) => stored,
            Err(e) => {
                if let Err(discard_err) = self.storage.discard(incident_id, &record.storage_key).await {
                    warn!(
                        "Failed to discard staged file {}: {}",
                        record.storage_key, discard_err
                    );
                }
                return Err(e);
            }
        };

        if let Err(e) = self.storage.promote(incident_id, &stored.storage_key).await {
            error!(
                "Failed to move staged file {} into place: {}",
                stored.storage_key, e
            );
            if let Err(delete_err) = self.files.delete(stored.id).await {
                error!(
                    "Failed to remove file record {} after storage failure: {}",
                    stored.id, delete_err
                );
            }
            if let Err(discard_err) = self.storage.discard(incident_id, &stored.storage_key).await {
                warn!(
                    "Failed to discard staged file {}: {}",
                    stored.storage_key, discard_err
                );
            }
            return Err(e);
        }

        info!(
            "File stored: id={}, incident={}, key={}, size={}",
            stored.id, stored.incident_id, stored.storage_key, stored.file_size
        );

        Ok(stored)
    }

    /// Upload files one after another, stopping at the first failure.
    ///
    /// Files stored before the failure are kept.
    pub async fn upload_multiple(
        &self,
        incident_id: Uuid,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<IncidentFile>> {
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            let name = file.file_name.clone();
            match self.upload_file(incident_id, file).await {
                Ok(record) => stored.push(record),
                Err(e) => {
                    warn!(
                        "Batch upload for incident {} stopped at '{}' after {} file(s): {}",
                        incident_id,
                        name,
                        stored.len(),
                        e
                    );
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    /// Attachments of one incident in upload order
    pub async fn list_files(&self, incident_id: Uuid) -> Result<Vec<IncidentFile>> {
        self.ensure_incident_exists(incident_id).await?;
        self.files.list_by_incident(incident_id).await
    }

    /// Metadata and bytes of one attachment of an incident
    pub async fn read_file(
        &self,
        incident_id: Uuid,
        file_id: Uuid,
    ) -> Result<(IncidentFile, Vec<u8>)> {
        let file = self
            .files
            .find_by_id(file_id)
            .await?
            .filter(|f| f.incident_id == incident_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "File {} not found for incident {}",
                    file_id, incident_id
                ))
            })?;

        let data = self.storage.read(file.incident_id, &file.storage_key).await?;
        Ok((file, data))
    }

    /// Finish or roll back uploads interrupted by a crash.
    ///
    /// A staged file whose metadata row exists is promoted; one without a row
    /// is discarded.
    pub async fn recover_pending_uploads(&self) -> Result<RecoveryReport> {
        let mut report = RecoveryReport::default();

        for staged in self.storage.pending_uploads().await? {
            if self.files.exists_by_storage_key(&staged.storage_key).await? {
                self.storage
                    .promote(staged.incident_id, &staged.storage_key)
                    .await?;
                report.promoted += 1;
            } else {
                self.storage
                    .discard(staged.incident_id, &staged.storage_key)
                    .await?;
                report.discarded += 1;
            }
            debug!(
                "Recovered staged upload {} for incident {}",
                staged.storage_key, staged.incident_id
            );
        }

        if report != RecoveryReport::default() {
            info!(
                "Recovered interrupted uploads: promoted={}, discarded={}",
                report.promoted, report.discarded
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::incidents::models::{CreateIncident, IncidentSeverity};
    use crate::shared::test_helpers::{InMemoryIncidentFileRepository, InMemoryIncidentRepository};
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        incidents: Arc<InMemoryIncidentRepository>,
        files: Arc<InMemoryIncidentFileRepository>,
        storage: Arc<LocalStorage>,
        service: FileService,
    }

    async fn fixture(max_file_size: u64) -> Fixture {
        let dir = tempdir().unwrap();
        let incidents = Arc::new(InMemoryIncidentRepository::default());
        let files = Arc::new(InMemoryIncidentFileRepository::default());
        let storage = Arc::new(LocalStorage::open(dir.path()).await.unwrap());
        let service = FileService::new(
            incidents.clone(),
            files.clone(),
            storage.clone(),
            max_file_size,
        );
        Fixture {
            _dir: dir,
            incidents,
            files,
            storage,
            service,
        }
    }

    async fn seed_incident(fx: &Fixture) -> Uuid {
        fx.incidents
            .insert(
                &CreateIncident {
                    title: "Outage".to_string(),
                    description: None,
                    severity: IncidentSeverity::High,
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_upload_stores_identical_bytes() {
        let fx = fixture(1024).await;
        let incident_id = seed_incident(&fx).await;
        let bytes = b"0123456789".to_vec();

        let file = fx
            .service
            .upload_file(
                incident_id,
                UploadedFile::new("log.txt", bytes.clone()).with_content_type("text/plain"),
            )
            .await
            .unwrap();

        assert_eq!(file.incident_id, incident_id);
        assert_eq!(file.file_name, "log.txt");
        assert_eq!(file.file_size, 10);
        assert!(file.file_path.contains(&incident_id.to_string()));
        assert_eq!(std::fs::read(&file.file_path).unwrap(), bytes);
        assert_eq!(fx.files.count(), 1);
        assert!(fx.storage.pending_uploads().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_to_missing_incident_is_not_found() {
        let fx = fixture(1024).await;

        let err = fx
            .service
            .upload_file(Uuid::new_v4(), UploadedFile::new("a.txt", b"abc".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(fx.files.count(), 0);
    }

    #[tokio::test]
    async fn test_upload_empty_file_is_rejected() {
        let fx = fixture(1024).await;
        let incident_id = seed_incident(&fx).await;

        let err = fx
            .service
            .upload_file(incident_id, UploadedFile::new("empty.txt", Vec::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(fx.files.count(), 0);
        assert!(fx.storage.pending_uploads().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_over_limit_uses_actual_length() {
        let fx = fixture(4).await;
        let incident_id = seed_incident(&fx).await;

        let err = fx
            .service
            .upload_file(incident_id, UploadedFile::new("big.bin", vec![1; 5]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        fx.service
            .upload_file(incident_id, UploadedFile::new("ok.bin", vec![1; 4]))
            .await
            .unwrap();
        assert_eq!(fx.files.count(), 1);
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_collide() {
        let fx = fixture(1024).await;
        let incident_id = seed_incident(&fx).await;

        let first = fx
            .service
            .upload_file(incident_id, UploadedFile::new("photo.png", b"one".to_vec()))
            .await
            .unwrap();
        let second = fx
            .service
            .upload_file(incident_id, UploadedFile::new("photo.png", b"two".to_vec()))
            .await
            .unwrap();

        assert_ne!(first.file_path, second.file_path);
        assert_eq!(std::fs::read(&first.file_path).unwrap(), b"one");
        assert_eq!(std::fs::read(&second.file_path).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_client_path_never_reaches_disk_layout() {
        let fx = fixture(1024).await;
        let incident_id = seed_incident(&fx).await;

        let file = fx
            .service
            .upload_file(
                incident_id,
                UploadedFile::new("../../outside.sh", b"#!/bin/sh".to_vec()),
            )
            .await
            .unwrap();

        assert_eq!(file.file_name, "outside.sh");
        assert!(std::path::Path::new(&file.file_path).starts_with(fx.storage.root()));
        assert!(!file.file_path.contains(".."));
    }

    #[tokio::test]
    async fn test_failed_insert_discards_staged_bytes() {
        let fx = fixture(1024).await;
        let incident_id = seed_incident(&fx).await;
        fx.files.fail_inserts(true);

        let err = fx
            .service
            .upload_file(incident_id, UploadedFile::new("a.txt", b"abc".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert!(fx.storage.pending_uploads().await.unwrap().is_empty());
        assert!(!fx.storage.root().join(incident_id.to_string()).exists());
    }

    #[tokio::test]
    async fn test_upload_multiple_stops_at_first_failure() {
        let fx = fixture(1024).await;
        let incident_id = seed_incident(&fx).await;

        let err = fx
            .service
            .upload_multiple(
                incident_id,
                vec![
                    UploadedFile::new("one.txt", b"1".to_vec()),
                    UploadedFile::new("empty.txt", Vec::new()),
                    UploadedFile::new("three.txt", b"3".to_vec()),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        let stored = fx.service.list_files(incident_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].file_name, "one.txt");
    }

    #[tokio::test]
    async fn test_validate_batch_names_offending_file() {
        let fx = fixture(1024).await;

        let err = fx
            .service
            .validate_batch(&[
                UploadedFile::new("fine.txt", b"x".to_vec()),
                UploadedFile::new("blank.txt", Vec::new()),
            ])
            .unwrap_err();

        match err {
            AppError::Validation(msg) => assert!(msg.starts_with("blank.txt")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(fx.service.validate_batch(&[]).is_ok());
    }

    #[tokio::test]
    async fn test_read_file_checks_owner() {
        let fx = fixture(1024).await;
        let incident_id = seed_incident(&fx).await;
        let other_id = seed_incident(&fx).await;

        let file = fx
            .service
            .upload_file(incident_id, UploadedFile::new("a.txt", b"abc".to_vec()))
            .await
            .unwrap();

        let (meta, data) = fx.service.read_file(incident_id, file.id).await.unwrap();
        assert_eq!(meta.id, file.id);
        assert_eq!(data, b"abc");

        let err = fx.service.read_file(other_id, file.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_recovery_promotes_recorded_and_discards_orphans() {
        let fx = fixture(1024).await;
        let incident_id = seed_incident(&fx).await;

        // Row written but the process stopped before the rename.
        fx.storage
            .stage(incident_id, "recorded.txt", b"kept")
            .await
            .unwrap();
        fx.files
            .insert(&CreateIncidentFile {
                incident_id,
                file_name: "recorded.txt".to_string(),
                storage_key: "recorded.txt".to_string(),
                file_path: fx
                    .storage
                    .file_path(incident_id, "recorded.txt")
                    .to_string_lossy()
                    .into_owned(),
                content_type: None,
                file_size: 4,
                uploaded_at: Utc::now(),
            })
            .await
            .unwrap();

        // Bytes staged but no row ever written.
        fx.storage
            .stage(incident_id, "orphan.txt", b"gone")
            .await
            .unwrap();

        let report = fx.service.recover_pending_uploads().await.unwrap();
        assert_eq!(
            report,
            RecoveryReport {
                promoted: 1,
                discarded: 1
            }
        );

        let (_, data) = fx
            .service
            .read_file(incident_id, fx.files.list_all().await.unwrap()[0].id)
            .await
            .unwrap();
        assert_eq!(data, b"kept");
        assert!(fx.storage.pending_uploads().await.unwrap().is_empty());
    }
}
