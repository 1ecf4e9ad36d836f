use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Router};
use std::sync::Arc;

use crate::features::files::handlers::{download_file, list_incident_files, upload_file};
use crate::features::files::services::FileService;

/// Create routes for the incident attachments feature
///
/// `body_limit` caps the multipart request size; the per-file limit is
/// enforced by the service.
pub fn routes(file_service: Arc<FileService>, body_limit: usize) -> Router {
    Router::new()
        .route(
            "/api/incidents/upload",
            post(upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/incidents/{id}/files", get(list_incident_files))
        .route("/api/incidents/{id}/files/{file_id}", get(download_file))
        .with_state(file_service)
}
