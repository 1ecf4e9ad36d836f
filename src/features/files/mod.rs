//! Incident attachments: upload, listing, download and crash recovery.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/incidents/upload` | Attach a file to an existing incident |
//! | GET | `/api/incidents/{id}/files` | List an incident's attachments |
//! | GET | `/api/incidents/{id}/files/{file_id}` | Download an attachment |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::PgIncidentFileRepository;
pub use routes::routes;
pub use services::FileService;
