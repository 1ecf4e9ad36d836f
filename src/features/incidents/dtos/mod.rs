mod incident_dto;

pub use incident_dto::{
    CreateIncidentDto, CreateIncidentWithFilesDto, IncidentResponseDto, IncidentWithFilesDto,
    UpdateIncidentStatusDto,
};
