mod file;

pub use file::{CreateIncidentFile, IncidentFile, UploadedFile};
