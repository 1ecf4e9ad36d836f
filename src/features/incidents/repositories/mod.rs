mod incident_repository;

pub use incident_repository::{IncidentRepository, PgIncidentRepository};
