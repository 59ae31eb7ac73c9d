//! Infrastructure layer for external integrations.
//!
//! This layer implements the ports defined by the domain layer, providing
//! concrete classification transports and page models.
//!
//! # Modules
//!
//! - [`classifier`] - Classification backends (HTTP and static)
//! - [`page`] - In-memory page model and JSON fixtures

pub mod classifier;
pub mod page;
