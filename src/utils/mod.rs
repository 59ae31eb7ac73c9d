//! Utility functions for URL processing, vendor lists and link selection.
//!
//! This module provides helper functions used across the crate:
//!
//! - [`extract_domain`] - Classification domain of a link destination
//! - [`priority`] - Vendor priority declaration parsing
//! - [`selector`] - Link selector matching for in-memory pages
//! - [`waypoint`] - Replacement URL construction

pub mod extract_domain;
pub mod priority;
pub mod selector;
pub mod waypoint;
