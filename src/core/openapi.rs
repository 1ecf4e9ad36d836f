use utoipa::{Modify, OpenApi};

use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::features::incidents::{
    dtos as incidents_dtos, handlers as incidents_handlers, models as incidents_models,
};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Incidents
        incidents_handlers::create_incident,
        incidents_handlers::create_incident_with_files,
        incidents_handlers::list_incidents,
        incidents_handlers::get_incident,
        incidents_handlers::update_incident_status,
        // Files
        files_handlers::upload_file,
        files_handlers::list_incident_files,
        files_handlers::download_file,
    ),
    components(
        schemas(
            Meta,
            // Incidents
            incidents_models::IncidentSeverity,
            incidents_models::IncidentStatus,
            incidents_dtos::CreateIncidentDto,
            incidents_dtos::CreateIncidentWithFilesDto,
            incidents_dtos::UpdateIncidentStatusDto,
            incidents_dtos::IncidentResponseDto,
            incidents_dtos::IncidentWithFilesDto,
            ApiResponse<incidents_dtos::IncidentResponseDto>,
            ApiResponse<incidents_dtos::IncidentWithFilesDto>,
            ApiResponse<Vec<incidents_dtos::IncidentWithFilesDto>>,
            // Files
            files_dtos::UploadIncidentFileDto,
            files_dtos::UploadFileResponseDto,
            files_dtos::IncidentFileDto,
            ApiResponse<files_dtos::UploadFileResponseDto>,
            ApiResponse<Vec<files_dtos::IncidentFileDto>>,
        )
    ),
    tags(
        (name = "incidents", description = "Incident records and status lifecycle"),
        (name = "files", description = "Incident attachments"),
    ),
    info(
        title = "Incident Desk API",
        version = "0.1.0",
        description = "API documentation for Incident Desk",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
