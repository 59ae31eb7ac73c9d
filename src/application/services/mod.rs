//! Vendor-facing services: per-vendor domain caches and link rewriters, plus
//! the coordinator that arbitrates between them.

pub mod coordinator;
pub mod link_rewriter;
pub mod resolution_cache;

pub use coordinator::{Arbitration, RewriterCoordinator, VendorScan};
pub use link_rewriter::{DEFAULT_RESTORE_DELAY, LinkRewriter, LinkRewriterOptions, ScanHandle};
pub use resolution_cache::{
    DomainResolutionCache, ResolverOptions, ResponseCallback, SharedClassification,
};
