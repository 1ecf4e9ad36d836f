use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{read_file_field, read_text_field, AppJson};
use crate::features::files::models::UploadedFile;
use crate::features::files::services::FileService;
use crate::features::incidents::dtos::{
    CreateIncidentDto, CreateIncidentWithFilesDto, IncidentResponseDto, IncidentWithFilesDto,
    UpdateIncidentStatusDto,
};
use crate::features::incidents::models::{CreateIncident, IncidentSeverity};
use crate::features::incidents::services::IncidentService;
use crate::shared::types::{ApiResponse, Meta};

/// State for incident handlers
#[derive(Clone)]
pub struct IncidentState {
    pub incident_service: Arc<IncidentService>,
    pub file_service: Arc<FileService>,
}

/// Create a new incident
#[utoipa::path(
    post,
    path = "/api/incidents",
    request_body = CreateIncidentDto,
    responses(
        (status = 201, description = "Incident created successfully", body = ApiResponse<IncidentResponseDto>),
        (status = 400, description = "Validation error")
    ),
    tag = "incidents"
)]
pub async fn create_incident(
    State(state): State<IncidentState>,
    AppJson(dto): AppJson<CreateIncidentDto>,
) -> Result<(StatusCode, Json<ApiResponse<IncidentResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // Declared size is a client hint; stored bytes are checked on upload.
    if let Some(declared) = dto.file_size {
        let max = state.file_service.max_file_size();
        if declared > max {
            return Err(AppError::Validation(format!(
                "File size must not exceed {} bytes",
                max
            )));
        }
    }

    let incident = state.incident_service.create_incident(dto.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(incident.into()),
            Some("Incident created successfully".to_string()),
            None,
        )),
    ))
}

/// Create an incident together with its attachments
///
/// Accepts multipart/form-data with:
/// - `title`, `description`, `severity`: Incident fields
/// - `files` (or `file`): Zero or more attachments
///
/// Every file is checked before the incident is created. Files are then
/// stored one after another.
#[utoipa::path(
    post,
    path = "/api/incidents/createwithfiles",
    tag = "incidents",
    request_body(
        content = CreateIncidentWithFilesDto,
        content_type = "multipart/form-data",
        description = "Incident fields and attachments",
    ),
    responses(
        (status = 201, description = "Incident created with attachments", body = ApiResponse<IncidentWithFilesDto>),
        (status = 400, description = "Validation error or malformed form")
    )
)]
pub async fn create_incident_with_files(
    State(state): State<IncidentState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<IncidentWithFilesDto>>)> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut severity: Option<IncidentSeverity> = None;
    let mut files: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "title" => title = Some(read_text_field(field, "title").await?),
            "description" => description = Some(read_text_field(field, "description").await?),
            "severity" => {
                let raw = read_text_field(field, "severity").await?;
                severity = Some(
                    raw.parse::<IncidentSeverity>()
                        .map_err(AppError::Validation)?,
                );
            }
            "files" | "file" => files.push(read_file_field(field).await?),
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let data = CreateIncident {
        title: title.ok_or_else(|| AppError::Validation("Title is required".to_string()))?,
        description,
        severity: severity
            .ok_or_else(|| AppError::Validation("Severity is required".to_string()))?,
    };

    state.file_service.validate_batch(&files)?;

    let incident = state.incident_service.create_incident(data).await?;
    let stored = state
        .file_service
        .upload_multiple(incident.id, files)
        .await?;

    let response = IncidentWithFilesDto {
        incident: incident.into(),
        files: stored.into_iter().map(|f| f.into()).collect(),
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(response),
            Some("Incident created successfully".to_string()),
            None,
        )),
    ))
}

/// List all incidents with their attachments
#[utoipa::path(
    get,
    path = "/api/incidents",
    responses(
        (status = 200, description = "Incidents in creation order", body = ApiResponse<Vec<IncidentWithFilesDto>>)
    ),
    tag = "incidents"
)]
pub async fn list_incidents(
    State(state): State<IncidentState>,
) -> Result<Json<ApiResponse<Vec<IncidentWithFilesDto>>>> {
    let incidents = state.incident_service.list_incidents_with_files().await?;
    let total = incidents.len();
    Ok(Json(ApiResponse::success(
        Some(incidents),
        None,
        Some(Meta::total(total)),
    )))
}

/// Get an incident by ID
#[utoipa::path(
    get,
    path = "/api/incidents/{id}",
    params(
        ("id" = Uuid, Path, description = "Incident ID")
    ),
    responses(
        (status = 200, description = "Incident found", body = ApiResponse<IncidentWithFilesDto>),
        (status = 404, description = "Incident not found")
    ),
    tag = "incidents"
)]
pub async fn get_incident(
    State(state): State<IncidentState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<IncidentWithFilesDto>>> {
    let incident = state.incident_service.get_incident_with_files(id).await?;
    Ok(Json(ApiResponse::success(Some(incident), None, None)))
}

/// Change the status of an incident
#[utoipa::path(
    patch,
    path = "/api/incidents/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Incident ID")
    ),
    request_body = UpdateIncidentStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<IncidentResponseDto>),
        (status = 400, description = "Unknown status or transition refused"),
        (status = 404, description = "Incident not found")
    ),
    tag = "incidents"
)]
pub async fn update_incident_status(
    State(state): State<IncidentState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateIncidentStatusDto>,
) -> Result<Json<ApiResponse<IncidentResponseDto>>> {
    let incident = state
        .incident_service
        .update_status(id, dto.status())
        .await?;
    Ok(Json(ApiResponse::success(
        Some(incident.into()),
        Some("Incident status updated".to_string()),
        None,
    )))
}

#[cfg(test)]
mod tests {
    use crate::features::files::services::FileService;
    use crate::features::incidents::services::IncidentService;
    use crate::modules::storage::LocalStorage;
    use crate::shared::test_helpers::{InMemoryIncidentFileRepository, InMemoryIncidentRepository};
    use axum::http::StatusCode;
    use chrono::{DateTime, Utc};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    const MAX_FILE_SIZE: u64 = 64;

    struct TestApp {
        server: TestServer,
        files: Arc<InMemoryIncidentFileRepository>,
        incidents: Arc<InMemoryIncidentRepository>,
        _dir: TempDir,
    }

    async fn create_test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorage::open(dir.path()).await.unwrap());
        let incidents = Arc::new(InMemoryIncidentRepository::default());
        let files = Arc::new(InMemoryIncidentFileRepository::default());

        let incident_service = Arc::new(IncidentService::new(incidents.clone(), files.clone()));
        let file_service = Arc::new(FileService::new(
            incidents.clone(),
            files.clone(),
            storage,
            MAX_FILE_SIZE,
        ));

        let app = crate::features::incidents::routes(
            incident_service,
            file_service.clone(),
            1024 * 1024,
        )
        .merge(crate::features::files::routes(file_service, 1024 * 1024));

        TestApp {
            server: TestServer::new(app).unwrap(),
            files,
            incidents,
            _dir: dir,
        }
    }

    async fn create_outage(server: &TestServer) -> Value {
        let response = server
            .post("/api/incidents")
            .json(&json!({
                "title": "Outage",
                "description": "db down",
                "severity": "high"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    #[tokio::test]
    async fn test_incident_lifecycle_end_to_end() {
        let app = create_test_app().await;
        let server = &app.server;

        let created = create_outage(server).await;
        assert_eq!(created["status"], "open");
        assert_eq!(created["severity"], "high");
        let id = created["id"].as_str().unwrap().to_string();

        let detail = server.get(&format!("/api/incidents/{}", id)).await;
        detail.assert_status_ok();
        assert_eq!(detail.json::<Value>()["data"]["files"], json!([]));

        let form = MultipartForm::new().add_text("incidentId", id.clone()).add_part(
            "file",
            Part::bytes(b"0123456789".to_vec())
                .file_name("trace.log")
                .mime_type("text/plain"),
        );
        let upload = server.post("/api/incidents/upload").multipart(form).await;
        upload.assert_status_ok();
        let uploaded = upload.json::<Value>()["data"].clone();
        assert_eq!(uploaded["fileName"], "trace.log");
        assert!(uploaded["filePath"].as_str().unwrap().contains(&id));

        let detail = server
            .get(&format!("/api/incidents/{}", id))
            .await
            .json::<Value>();
        assert_eq!(detail["data"]["files"].as_array().unwrap().len(), 1);

        let resolved = server
            .patch(&format!("/api/incidents/{}/status", id))
            .json(&json!({ "status": "resolved" }))
            .await;
        resolved.assert_status_ok();
        let resolved = resolved.json::<Value>()["data"].clone();
        assert_eq!(resolved["status"], "resolved");
        let updated_at: DateTime<Utc> =
            serde_json::from_value(resolved["updatedAt"].clone()).unwrap();
        let created_at: DateTime<Utc> =
            serde_json::from_value(created["updatedAt"].clone()).unwrap();
        assert!(updated_at >= created_at);

        let reopened = server
            .patch(&format!("/api/incidents/{}/status", id))
            .json(&json!("open"))
            .await;
        reopened.assert_status_ok();
        assert_eq!(reopened.json::<Value>()["data"]["status"], "open");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let app = create_test_app().await;

        let blank = app
            .server
            .post("/api/incidents")
            .json(&json!({ "title": "", "severity": "low" }))
            .await;
        blank.assert_status(StatusCode::BAD_REQUEST);

        let oversized = app
            .server
            .post("/api/incidents")
            .json(&json!({
                "title": "Outage",
                "severity": "low",
                "fileSize": MAX_FILE_SIZE + 1
            }))
            .await;
        oversized.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(oversized.json::<Value>()["success"], false);

        let unknown_severity = app
            .server
            .post("/api/incidents")
            .json(&json!({ "title": "Outage", "severity": "apocalyptic" }))
            .await;
        unknown_severity.assert_status(StatusCode::BAD_REQUEST);

        assert_eq!(app.incidents.count(), 0);
    }

    #[tokio::test]
    async fn test_missing_incident_is_not_found() {
        let app = create_test_app().await;
        let id = Uuid::new_v4();

        app.server
            .get(&format!("/api/incidents/{}", id))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        app.server
            .patch(&format!("/api/incidents/{}/status", id))
            .json(&json!({ "status": "resolved" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let form = MultipartForm::new()
            .add_text("incidentId", id.to_string())
            .add_part("file", Part::bytes(b"abc".to_vec()).file_name("a.txt"));
        app.server
            .post("/api/incidents/upload")
            .multipart(form)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        assert_eq!(app.files.count(), 0);
    }

    #[tokio::test]
    async fn test_update_status_rejects_unknown_value() {
        let app = create_test_app().await;
        let created = create_outage(&app.server).await;
        let id = created["id"].as_str().unwrap();

        app.server
            .patch(&format!("/api/incidents/{}/status", id))
            .json(&json!({ "status": "closed" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.server
            .patch(&format!("/api/incidents/{}/status", id))
            .json(&json!(3))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_numeric_enum_values_are_accepted() {
        let app = create_test_app().await;

        let created = app
            .server
            .post("/api/incidents")
            .json(&json!({ "title": "Outage", "severity": 2 }))
            .await;
        created.assert_status(StatusCode::CREATED);
        let created = created.json::<Value>()["data"].clone();
        assert_eq!(created["severity"], "high");
        let id = created["id"].as_str().unwrap();

        let resolved = app
            .server
            .patch(&format!("/api/incidents/{}/status", id))
            .json(&json!(2))
            .await;
        resolved.assert_status_ok();
        assert_eq!(resolved.json::<Value>()["data"]["status"], "resolved");

        let in_progress = app
            .server
            .patch(&format!("/api/incidents/{}/status", id))
            .json(&json!({ "status": 1 }))
            .await;
        in_progress.assert_status_ok();
        assert_eq!(in_progress.json::<Value>()["data"]["status"], "in_progress");

        app.server
            .post("/api/incidents")
            .json(&json!({ "title": "Outage", "severity": 4 }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_file() {
        let app = create_test_app().await;
        let created = create_outage(&app.server).await;
        let id = created["id"].as_str().unwrap().to_string();

        let form = MultipartForm::new()
            .add_text("incidentId", id)
            .add_part("file", Part::bytes(Vec::<u8>::new()).file_name("empty.txt"));
        app.server
            .post("/api/incidents/upload")
            .multipart(form)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(app.files.count(), 0);
    }

    #[tokio::test]
    async fn test_create_with_files_returns_created_incident() {
        let app = create_test_app().await;

        let form = MultipartForm::new()
            .add_text("title", "Outage")
            .add_text("description", "db down")
            .add_text("severity", "2")
            .add_part("files", Part::bytes(b"first".to_vec()).file_name("a.txt"))
            .add_part("files", Part::bytes(b"second".to_vec()).file_name("b.txt"));
        let response = app
            .server
            .post("/api/incidents/createwithfiles")
            .multipart(form)
            .await;

        response.assert_status(StatusCode::CREATED);
        let data = response.json::<Value>()["data"].clone();
        assert_eq!(data["severity"], "high");
        assert_eq!(data["status"], "open");
        let names: Vec<&str> = data["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["fileName"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);

        let listed = app.server.get("/api/incidents").await.json::<Value>();
        assert_eq!(listed["meta"]["total"], 1);
        assert_eq!(listed["data"][0]["files"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_with_files_checks_files_before_creating() {
        let app = create_test_app().await;

        let form = MultipartForm::new()
            .add_text("title", "Outage")
            .add_text("severity", "low")
            .add_part("files", Part::bytes(b"ok".to_vec()).file_name("a.txt"))
            .add_part(
                "files",
                Part::bytes(vec![0u8; MAX_FILE_SIZE as usize + 1]).file_name("big.bin"),
            );
        app.server
            .post("/api/incidents/createwithfiles")
            .multipart(form)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        assert_eq!(app.incidents.count(), 0);
        assert_eq!(app.files.count(), 0);
    }

    #[tokio::test]
    async fn test_download_returns_stored_bytes() {
        let app = create_test_app().await;
        let created = create_outage(&app.server).await;
        let id = created["id"].as_str().unwrap().to_string();

        let form = MultipartForm::new().add_text("incidentId", id.clone()).add_part(
            "file",
            Part::bytes(b"hello".to_vec())
                .file_name("note.txt")
                .mime_type("text/plain"),
        );
        let uploaded = app
            .server
            .post("/api/incidents/upload")
            .multipart(form)
            .await
            .json::<Value>();
        let file_id = uploaded["data"]["fileId"].as_str().unwrap();

        let listed = app
            .server
            .get(&format!("/api/incidents/{}/files", id))
            .await
            .json::<Value>();
        assert_eq!(listed["meta"]["total"], 1);

        let download = app
            .server
            .get(&format!("/api/incidents/{}/files/{}", id, file_id))
            .await;
        download.assert_status_ok();
        assert_eq!(&download.as_bytes()[..], b"hello");
        assert_eq!(download.header("content-type"), "text/plain");
    }
}
