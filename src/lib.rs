//! # Link Arbiter
//!
//! Coordinates several independent link-rewriting vendors on one page so that
//! every outbound link activation is rewritten by at most one of them.
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture principles with clear layer separation:
//!
//! - **Domain Layer** ([`domain`]) - Link, classification and rewrite entities plus the
//!   host-facing ports (`Page`, `ClassificationBackend`, `LinkResolver`)
//! - **Application Layer** ([`application`]) - Domain resolution cache, per-vendor link
//!   rewriters and the arbitrating coordinator
//! - **Infrastructure Layer** ([`infrastructure`]) - HTTP and static classification
//!   backends, in-memory page model
//!
//! ## Features
//!
//! - Deterministic vendor priority with per-link overrides
//! - Optimistic rewriting while domain classification is still in flight
//! - Single-flight classification requests per domain
//! - Temporary rewrites restored after a short delay
//!
//! ## Quick Start
//!
//! ```bash
//! # Scan a page fixture and print every vendor's decisions
//! cargo run -- --page page.json scan
//!
//! # Simulate a click on link 3
//! cargo run -- --page page.json click --link 3
//! ```
//!
//! ## Configuration
//!
//! The command-line tool is configured from environment variables via
//! [`config::Config`]. The library itself takes every setting as an argument.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod utils;

pub use error::{ArbiterError, ClassifyError};

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::services::{
        Arbitration, DomainResolutionCache, LinkRewriter, LinkRewriterOptions, ResolverOptions,
        RewriterCoordinator, ScanHandle, VendorScan,
    };
    pub use crate::domain::activation::{ActionClass, LinkActivation};
    pub use crate::domain::entities::{
        Anchor, DomainStatus, LinkId, ReplacementLookup, RewriteRecord, TwoStepResponse,
    };
    pub use crate::domain::events::RewriterEvent;
    pub use crate::domain::ports::{ClassificationBackend, LinkResolver, Page};
    pub use crate::error::{ArbiterError, ClassifyError};
    pub use crate::infrastructure::classifier::{
        HttpClassificationBackend, StaticClassificationBackend,
    };
    pub use crate::infrastructure::page::InMemoryPage;
    pub use crate::utils::waypoint::WaypointUrlBuilder;
}
