//! Trait definitions for everything the core does not own.
//!
//! The core never touches the page, the network or a vendor's business logic
//! directly. It talks to them through these traits, which the host (or the
//! [`crate::infrastructure`] layer) implements.
//!
//! # Available Ports
//!
//! - [`Page`] - Link enumeration and destination read/write
//! - [`ClassificationBackend`] - Batched domain classification requests
//! - [`LinkResolver`] - Per-vendor resolver callback returning a two-step response
//!
//! # Testing
//!
//! Mock implementations are auto-generated via `mockall` under `cfg(test)`.

pub mod classifier;
pub mod page;
pub mod resolver;

pub use classifier::{ClassificationBackend, ClassificationRequest, ClassificationResponse};
pub use page::{DEFAULT_LINK_SELECTOR, LINK_PRIORITY_ATTRIBUTE, Page};
pub use resolver::LinkResolver;

#[cfg(test)]
pub use classifier::MockClassificationBackend;
#[cfg(test)]
pub use page::MockPage;
#[cfg(test)]
pub use resolver::MockLinkResolver;
