use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{read_file_field, read_text_field};
use crate::features::files::dtos::{IncidentFileDto, UploadFileResponseDto, UploadIncidentFileDto};
use crate::features::files::models::UploadedFile;
use crate::features::files::services::FileService;
use crate::shared::types::{ApiResponse, Meta};

/// Upload a file for an incident
///
/// Accepts multipart/form-data with:
/// - `incidentId`: The incident the file belongs to (required)
/// - `file`: The file to upload (required)
#[utoipa::path(
    post,
    path = "/api/incidents/upload",
    tag = "files",
    request_body(
        content = UploadIncidentFileDto,
        content_type = "multipart/form-data",
        description = "Incident id and the file to attach",
    ),
    responses(
        (status = 200, description = "File uploaded successfully", body = ApiResponse<UploadFileResponseDto>),
        (status = 400, description = "Empty file, file too large or malformed form"),
        (status = 404, description = "Incident not found")
    )
)]
pub async fn upload_file(
    State(service): State<Arc<FileService>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadFileResponseDto>>> {
    let mut incident_id: Option<Uuid> = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "incidentId" | "incident_id" => {
                let text = read_text_field(field, "incidentId").await?;
                let id = Uuid::parse_str(text.trim()).map_err(|_| {
                    AppError::BadRequest(format!("Invalid incidentId '{}'", text.trim()))
                })?;
                incident_id = Some(id);
            }
            "file" => {
                file = Some(read_file_field(field).await?);
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let incident_id =
        incident_id.ok_or_else(|| AppError::BadRequest("incidentId is required".to_string()))?;
    let file = file.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;

    let stored = service.upload_file(incident_id, file).await?;

    Ok(Json(ApiResponse::success(
        Some(stored.into()),
        Some("File uploaded successfully".to_string()),
        None,
    )))
}

/// List the attachments of an incident
#[utoipa::path(
    get,
    path = "/api/incidents/{id}/files",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "Incident ID")
    ),
    responses(
        (status = 200, description = "Attachments in upload order", body = ApiResponse<Vec<IncidentFileDto>>),
        (status = 404, description = "Incident not found")
    )
)]
pub async fn list_incident_files(
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<IncidentFileDto>>>> {
    let files = service.list_files(id).await?;
    let total = files.len();
    let dtos: Vec<IncidentFileDto> = files.into_iter().map(|f| f.into()).collect();
    Ok(Json(ApiResponse::success(
        Some(dtos),
        None,
        Some(Meta::total(total)),
    )))
}

/// Download an attachment
#[utoipa::path(
    get,
    path = "/api/incidents/{id}/files/{file_id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "Incident ID"),
        ("file_id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Raw file content", content_type = "application/octet-stream"),
        (status = 404, description = "Incident or file not found")
    )
)]
pub async fn download_file(
    State(service): State<Arc<FileService>>,
    Path((id, file_id)): Path<(Uuid, Uuid)>,
) -> Result<Response> {
    let (file, data) = service.read_file(id, file_id).await?;

    let content_type = file
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&file.file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = Response::new(Body::from(data));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, disposition);

    Ok(response)
}

/// `attachment; filename="..."` with characters unsafe in a quoted header replaced
fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}
