pub mod files;
pub mod incidents;
