use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::incidents::models::{CreateIncident, Incident, IncidentStatus};

/// Persistence port for incident records
#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Insert a new incident in the initial status, stamped with `now`
    async fn insert(&self, data: &CreateIncident, now: DateTime<Utc>) -> Result<Incident>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Incident>>;

    /// All incidents in insertion order
    async fn list(&self) -> Result<Vec<Incident>>;

    /// Set the status; `updated_at` never moves backwards.
    /// Returns `None` when the incident does not exist.
    async fn update_status(
        &self,
        id: Uuid,
        status: IncidentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Incident>>;
}

const INCIDENT_COLUMNS: &str = "id, title, description, severity, status, created_at, updated_at";

/// PostgreSQL-backed incident store
pub struct PgIncidentRepository {
    pool: PgPool,
}

impl PgIncidentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IncidentRepository for PgIncidentRepository {
    async fn insert(&self, data: &CreateIncident, now: DateTime<Utc>) -> Result<Incident> {
        let query = format!(
            r#"
            INSERT INTO incidents (title, description, severity, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {INCIDENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Incident>(&query)
            .bind(&data.title)
            .bind(&data.description)
            .bind(data.severity)
            .bind(IncidentStatus::INITIAL)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create incident: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Incident>> {
        let query = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = $1");

        sqlx::query_as::<_, Incident>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get incident {}: {:?}", id, e);
                AppError::Database(e)
            })
    }

    async fn list(&self) -> Result<Vec<Incident>> {
        let query = format!("SELECT {INCIDENT_COLUMNS} FROM incidents ORDER BY created_at, id");

        sqlx::query_as::<_, Incident>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list incidents: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: IncidentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Incident>> {
        let query = format!(
            r#"
            UPDATE incidents
            SET status = $2, updated_at = GREATEST($3, updated_at)
            WHERE id = $1
            RETURNING {INCIDENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Incident>(&query)
            .bind(id)
            .bind(status)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update status of incident {}: {:?}", id, e);
                AppError::Database(e)
            })
    }
}
