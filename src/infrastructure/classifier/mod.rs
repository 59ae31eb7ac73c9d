//! Classification backends.
//!
//! Implementations of [`ClassificationBackend`](crate::domain::ports::ClassificationBackend):
//! - [`HttpClassificationBackend`] - Production backend over HTTP (reqwest)
//! - [`StaticClassificationBackend`] - Fixed merchant set for offline runs and tests

mod http_classifier;
mod static_classifier;

pub use http_classifier::HttpClassificationBackend;
pub use static_classifier::StaticClassificationBackend;
