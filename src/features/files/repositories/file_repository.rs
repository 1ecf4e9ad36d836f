use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{CreateIncidentFile, IncidentFile};

/// Persistence port for attachment metadata
#[async_trait]
pub trait IncidentFileRepository: Send + Sync {
    async fn insert(&self, data: &CreateIncidentFile) -> Result<IncidentFile>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IncidentFile>>;

    /// Files of one incident in upload order
    async fn list_by_incident(&self, incident_id: Uuid) -> Result<Vec<IncidentFile>>;

    /// Every file of every incident in upload order
    async fn list_all(&self) -> Result<Vec<IncidentFile>>;

    async fn exists_by_storage_key(&self, storage_key: &str) -> Result<bool>;
}

const FILE_COLUMNS: &str =
    "id, incident_id, file_name, storage_key, file_path, content_type, file_size, uploaded_at";

/// A foreign key violation means the owning incident was deleted after it
/// was looked up.
fn insert_error(incident_id: Uuid, e: sqlx::Error) -> AppError {
    let missing_incident = e
        .as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation());
    if missing_incident {
        tracing::warn!(
            "Incident {} disappeared before its file was recorded",
            incident_id
        );
        return AppError::NotFound(format!("Incident {} not found", incident_id));
    }

    tracing::error!("Failed to record file for incident {}: {:?}", incident_id, e);
    AppError::Database(e)
}

/// PostgreSQL-backed attachment metadata store
pub struct PgIncidentFileRepository {
    pool: PgPool,
}

impl PgIncidentFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IncidentFileRepository for PgIncidentFileRepository {
    async fn insert(&self, data: &CreateIncidentFile) -> Result<IncidentFile> {
        let query = format!(
            r#"
            INSERT INTO incident_files
                (incident_id, file_name, storage_key, file_path, content_type, file_size, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {FILE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, IncidentFile>(&query)
            .bind(data.incident_id)
            .bind(&data.file_name)
            .bind(&data.storage_key)
            .bind(&data.file_path)
            .bind(&data.content_type)
            .bind(data.file_size)
            .bind(data.uploaded_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| insert_error(data.incident_id, e))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM incident_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete file record {}: {:?}", id, e);
                AppError::Database(e)
            })?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IncidentFile>> {
        let query = format!("SELECT {FILE_COLUMNS} FROM incident_files WHERE id = $1");

        sqlx::query_as::<_, IncidentFile>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get file {}: {:?}", id, e);
                AppError::Database(e)
            })
    }

    async fn list_by_incident(&self, incident_id: Uuid) -> Result<Vec<IncidentFile>> {
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM incident_files WHERE incident_id = $1 ORDER BY uploaded_at, id"
        );

        sqlx::query_as::<_, IncidentFile>(&query)
            .bind(incident_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list files of incident {}: {:?}", incident_id, e);
                AppError::Database(e)
            })
    }

    async fn list_all(&self) -> Result<Vec<IncidentFile>> {
        let query = format!("SELECT {FILE_COLUMNS} FROM incident_files ORDER BY uploaded_at, id");

        sqlx::query_as::<_, IncidentFile>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list incident files: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn exists_by_storage_key(&self, storage_key: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM incident_files WHERE storage_key = $1)",
        )
        .bind(storage_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up storage key {}: {:?}", storage_key, e);
            AppError::Database(e)
        })
    }
}
