//! Incident records and their status lifecycle.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/incidents` | Create an incident |
//! | POST | `/api/incidents/createwithfiles` | Create an incident with attachments |
//! | GET | `/api/incidents` | List incidents with their attachments |
//! | GET | `/api/incidents/{id}` | Get one incident with its attachments |
//! | PATCH | `/api/incidents/{id}/status` | Change the status |

pub mod dtos;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::PgIncidentRepository;
pub use routes::routes;
pub use services::IncidentService;
