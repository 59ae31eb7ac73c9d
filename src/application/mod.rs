//! Application layer: the arbitration logic built on top of the domain ports.
//!
//! Services consume the [`Page`](crate::domain::ports::Page),
//! [`LinkResolver`](crate::domain::ports::LinkResolver) and
//! [`ClassificationBackend`](crate::domain::ports::ClassificationBackend) traits
//! and never depend on a concrete page or transport.
//!
//! # Available Services
//!
//! - [`services::resolution_cache::DomainResolutionCache`] - Domain classification with single-flight batching
//! - [`services::link_rewriter::LinkRewriter`] - One vendor's watched links and rewrite decisions
//! - [`services::coordinator::RewriterCoordinator`] - Vendor priority and click-time arbitration

pub mod services;
