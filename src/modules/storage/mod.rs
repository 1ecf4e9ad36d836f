//! Storage module for incident attachments
//!
//! Provides the local uploads tree: staging, atomic promotion into the
//! per-incident directories, reads and crash recovery listing.

mod local_storage;

pub use local_storage::{LocalStorage, StagedUpload};
