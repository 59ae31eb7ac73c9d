//! Resolver callback contract between a vendor and its rewriter.

use crate::domain::entities::{Anchor, TwoStepResponse};

/// Decides replacement URLs for links a rewriter has just discovered.
///
/// Called once per scan with the links that were not in the rewriter's map yet.
/// The returned [`TwoStepResponse`] must carry at least one half; records may
/// only reference links from `links`.
///
/// Closures of the right shape implement this trait, so a vendor without a
/// cache can register `|links: &[Anchor]| TwoStepResponse::from_sync(..)`.
///
/// # Implementations
///
/// - [`crate::application::services::DomainResolutionCache`] - Cached backend classification
/// - Any `Fn(&[Anchor]) -> TwoStepResponse + Send + Sync`
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
pub trait LinkResolver: Send + Sync {
    fn resolve_unknown_links(&self, links: &[Anchor]) -> TwoStepResponse;
}

impl<F> LinkResolver for F
where
    F: Fn(&[Anchor]) -> TwoStepResponse + Send + Sync,
{
    fn resolve_unknown_links(&self, links: &[Anchor]) -> TwoStepResponse {
        self(links)
    }
}
