use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::files::models::IncidentFile;

/// Upload request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadIncidentFileDto {
    /// Incident the file belongs to (form part `incidentId`)
    pub incident_id: Uuid,
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// Response DTO for a single upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileResponseDto {
    pub file_id: Uuid,
    /// Original filename as uploaded
    pub file_name: String,
    /// Server-side storage location
    pub file_path: String,
}

impl From<IncidentFile> for UploadFileResponseDto {
    fn from(f: IncidentFile) -> Self {
        Self {
            file_id: f.id,
            file_name: f.file_name,
            file_path: f.file_path,
        }
    }
}

/// Attachment summary nested in incident responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncidentFileDto {
    pub id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub content_type: Option<String>,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<IncidentFile> for IncidentFileDto {
    fn from(f: IncidentFile) -> Self {
        Self {
            id: f.id,
            file_name: f.file_name,
            file_path: f.file_path,
            content_type: f.content_type,
            file_size: f.file_size,
            uploaded_at: f.uploaded_at,
        }
    }
}
