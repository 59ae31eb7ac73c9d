//! Multi-vendor registry and click-time arbitration.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::application::services::link_rewriter::{
    LinkRewriter, LinkRewriterOptions, RestoreLedger, ScanHandle,
};
use crate::domain::activation::LinkActivation;
use crate::domain::entities::LinkId;
use crate::domain::ports::{LINK_PRIORITY_ATTRIBUTE, LinkResolver, Page};
use crate::error::ArbiterError;
use crate::utils::priority::parse_vendor_list;

/// Outcome of one vendor's scan in [`RewriterCoordinator::on_content_changed`].
#[derive(Debug)]
pub struct VendorScan {
    pub vendor: String,
    pub result: Result<ScanHandle, ArbiterError>,
}

/// Outcome of [`RewriterCoordinator::on_link_activation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arbitration {
    /// The action class is not arbitrated; no vendor was consulted.
    Ignored,
    /// The named vendor rewrote the link.
    Replaced { vendor: String },
    /// No candidate vendor had a replacement.
    NotReplaced,
}

impl Arbitration {
    pub fn vendor(&self) -> Option<&str> {
        match self {
            Self::Replaced { vendor } => Some(vendor),
            _ => None,
        }
    }
}

/// Owns every vendor's [`LinkRewriter`] on one page and decides, per link
/// activation, which single vendor gets to rewrite the link.
///
/// # Ordering
///
/// Rewriters are kept sorted by the page-level priority declaration.
/// Vendors absent from the declaration come after every listed vendor, in
/// registration order. A link can replace that order with its own
/// `data-link-rewriters` attribute.
///
/// Rewriters registered here share one restore ledger, so back-to-back
/// activations won by different vendors still put the authored href back.
pub struct RewriterCoordinator {
    page: Arc<dyn Page>,
    priority_list: Vec<String>,
    rewriters: Vec<LinkRewriter>,
    restores: RestoreLedger,
}

impl RewriterCoordinator {
    pub fn new(page: Arc<dyn Page>, priority_list: Vec<String>) -> Self {
        debug!(priority = ?priority_list, "Coordinator created");
        Self {
            page,
            priority_list,
            rewriters: Vec::new(),
            restores: RestoreLedger::default(),
        }
    }

    /// Creates a coordinator from a whitespace-separated priority declaration.
    pub fn from_declaration(page: Arc<dyn Page>, declaration: &str) -> Self {
        Self::new(page, parse_vendor_list(declaration))
    }

    pub fn priority_list(&self) -> &[String] {
        &self.priority_list
    }

    /// Registered rewriters in global priority order.
    pub fn rewriters(&self) -> &[LinkRewriter] {
        &self.rewriters
    }

    /// First rewriter registered under `vendor`.
    pub fn rewriter(&self, vendor: &str) -> Option<&LinkRewriter> {
        self.rewriters.iter().find(|rewriter| rewriter.name() == vendor)
    }

    /// Creates a rewriter for `vendor` and inserts it at its priority position.
    ///
    /// A vendor registered twice gets two independent rewriters; link overrides
    /// only ever reach the first one.
    ///
    /// # Errors
    ///
    /// Returns [`ArbiterError::Configuration`] if the vendor's link selector
    /// cannot be parsed. Nothing is registered in that case.
    pub fn register_rewriter(
        &mut self,
        vendor: impl Into<String>,
        resolver: impl LinkResolver + 'static,
        options: LinkRewriterOptions,
    ) -> Result<LinkRewriter, ArbiterError> {
        let vendor = vendor.into();

        if self.rewriter(&vendor).is_some() {
            warn!(vendor = %vendor, "Vendor registered more than once");
        }

        let rewriter = LinkRewriter::with_restore_ledger(
            vendor.clone(),
            Arc::new(resolver),
            Arc::clone(&self.page),
            options,
            self.restores.clone(),
        )?;

        let rank = self.rank(&vendor);
        let position = self
            .rewriters
            .iter()
            .position(|existing| self.rank(existing.name()) > rank)
            .unwrap_or(self.rewriters.len());
        self.rewriters.insert(position, rewriter.clone());

        info!(
            vendor = %vendor,
            position,
            registered = self.rewriters.len(),
            "Rewriter registered"
        );

        Ok(rewriter)
    }

    /// Makes every rewriter rescan the page.
    ///
    /// One vendor's failure does not stop the others; each outcome is returned
    /// and failures are logged.
    pub fn on_content_changed(&self) -> Vec<VendorScan> {
        self.rewriters
            .iter()
            .map(|rewriter| {
                let result = rewriter.on_scan();
                if let Err(e) = &result {
                    error!(vendor = %rewriter.name(), error = %e, "Scan failed");
                }
                VendorScan {
                    vendor: rewriter.name().to_string(),
                    result,
                }
            })
            .collect()
    }

    /// Arbitrates a link activation.
    ///
    /// For arbitrated action classes, candidate vendors (those watching the
    /// link, in override or global order) are asked in turn to rewrite it; the
    /// first that does wins and the rest are skipped. Every candidate is then
    /// told which vendor, if any, replaced the link.
    pub fn on_link_activation(&self, activation: &LinkActivation) -> Arbitration {
        if !activation.action.is_arbitrated() {
            debug!(
                link = %activation.link,
                action = %activation.action,
                "Action class not arbitrated"
            );
            return Arbitration::Ignored;
        }

        let candidates = self.candidates(activation.link);
        let winner = candidates
            .iter()
            .find(|rewriter| rewriter.rewrite_anchor_url(activation.link))
            .map(|rewriter| rewriter.name().to_string());

        for rewriter in &candidates {
            rewriter.notify_click(activation.link, winner.as_deref());
        }

        match winner {
            Some(vendor) => {
                info!(link = %activation.link, vendor = %vendor, "Link replaced");
                Arbitration::Replaced { vendor }
            }
            None => {
                debug!(
                    link = %activation.link,
                    candidates = candidates.len(),
                    "No vendor replaced the link"
                );
                Arbitration::NotReplaced
            }
        }
    }

    /// Watching rewriters for `link`, in the order they get to try.
    fn candidates(&self, link: LinkId) -> Vec<&LinkRewriter> {
        let ordered: Vec<&LinkRewriter> =
            match self.page.attribute(link, LINK_PRIORITY_ATTRIBUTE) {
                Some(declaration) => parse_vendor_list(&declaration)
                    .iter()
                    .filter_map(|vendor| {
                        let rewriter = self.rewriter(vendor);
                        if rewriter.is_none() {
                            debug!(%link, vendor = %vendor, "Override names unknown vendor");
                        }
                        rewriter
                    })
                    .collect(),
                None => self.rewriters.iter().collect(),
            };

        ordered
            .into_iter()
            .filter(|rewriter| rewriter.is_watching_link(link))
            .collect()
    }

    fn rank(&self, vendor: &str) -> usize {
        self.priority_list
            .iter()
            .position(|listed| listed == vendor)
            .unwrap_or(usize::MAX)
    }
}
