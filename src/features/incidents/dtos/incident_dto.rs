use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::files::dtos::IncidentFileDto;
use crate::features::incidents::models::{
    CreateIncident, Incident, IncidentSeverity, IncidentStatus,
};

/// Request DTO for creating an incident
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncidentDto {
    /// Short summary of the incident (required)
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    #[schema(example = "Outage")]
    pub title: String,

    /// Optional longer description
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    #[schema(example = "db down")]
    pub description: Option<String>,

    pub severity: IncidentSeverity,

    /// Client-declared size of the attachment it intends to upload, in bytes.
    /// Only used as a pre-flight check against the configured maximum.
    #[serde(default, alias = "declaredFileSize")]
    pub file_size: Option<u64>,
}

impl From<CreateIncidentDto> for CreateIncident {
    fn from(dto: CreateIncidentDto) -> Self {
        Self {
            title: dto.title,
            description: dto.description,
            severity: dto.severity,
        }
    }
}

/// Multipart form for creating an incident together with its attachments
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CreateIncidentWithFilesDto {
    #[schema(example = "Outage")]
    pub title: String,
    #[schema(example = "db down")]
    pub description: Option<String>,
    /// Severity name (`low`, `medium`, `high`, `critical`) or ordinal `0`-`3`
    #[schema(example = "high")]
    pub severity: String,
    /// Zero or more files, each sent as a `files` part
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub files: Vec<String>,
}

/// Request DTO for a status change.
///
/// Accepts either `{"status": "resolved"}` or a bare `"resolved"`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum UpdateIncidentStatusDto {
    Wrapped { status: IncidentStatus },
    Bare(IncidentStatus),
}

impl UpdateIncidentStatusDto {
    pub fn status(&self) -> IncidentStatus {
        match self {
            UpdateIncidentStatusDto::Wrapped { status } | UpdateIncidentStatusDto::Bare(status) => {
                *status
            }
        }
    }
}

/// Response DTO for incident
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncidentResponseDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub severity: IncidentSeverity,
    pub status: IncidentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Incident> for IncidentResponseDto {
    fn from(i: Incident) -> Self {
        Self {
            id: i.id,
            title: i.title,
            description: i.description,
            severity: i.severity,
            status: i.status,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

/// Response DTO for incident with its attachments
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncidentWithFilesDto {
    #[serde(flatten)]
    pub incident: IncidentResponseDto,
    pub files: Vec<IncidentFileDto>,
}
