use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for an incident attachment
#[derive(Debug, Clone, FromRow)]
pub struct IncidentFile {
    pub id: Uuid,
    pub incident_id: Uuid,
    /// Name the client uploaded the file under, kept as metadata only
    pub file_name: String,
    /// Opaque on-disk name, unique across the uploads root
    pub storage_key: String,
    pub file_path: String,
    pub content_type: Option<String>,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Data for recording a stored attachment
#[derive(Debug, Clone)]
pub struct CreateIncidentFile {
    pub incident_id: Uuid,
    pub file_name: String,
    pub storage_key: String,
    pub file_path: String,
    pub content_type: Option<String>,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Attachment bytes received from a client, not yet validated
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            data,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}
