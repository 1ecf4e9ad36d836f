//! Modules layer - Infrastructure components
//!
//! Contains adapters for resources outside the database, such as the
//! attachment storage tree.

pub mod storage;
