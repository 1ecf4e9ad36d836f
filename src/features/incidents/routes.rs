use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::services::FileService;
use crate::features::incidents::handlers::{self, IncidentState};
use crate::features::incidents::services::IncidentService;

/// Create routes for the incidents feature
pub fn routes(
    incident_service: Arc<IncidentService>,
    file_service: Arc<FileService>,
    body_limit: usize,
) -> Router {
    let state = IncidentState {
        incident_service,
        file_service,
    };

    Router::new()
        .route(
            "/api/incidents",
            get(handlers::list_incidents).post(handlers::create_incident),
        )
        // Static segment must come before {id}
        .route(
            "/api/incidents/createwithfiles",
            post(handlers::create_incident_with_files)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/incidents/{id}", get(handlers::get_incident))
        .route(
            "/api/incidents/{id}/status",
            patch(handlers::update_incident_status),
        )
        .with_state(state)
}
