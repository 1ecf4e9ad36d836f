mod incident;

pub use incident::{
    CreateIncident, Incident, IncidentSeverity, IncidentStatus, DESCRIPTION_MAX_LEN,
    TITLE_MAX_LEN,
};
