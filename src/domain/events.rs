//! Notifications emitted by a rewriter to its subscribers.

use super::entities::LinkId;

/// Event published on a [`LinkRewriter`](crate::application::services::LinkRewriter)'s channel.
///
/// Vendors subscribe to these to drive their own reporting, e.g. sending
/// impression data after a scan or non-affiliate click data when another
/// vendor (or nobody) rewrote a link they watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriterEvent {
    /// One `on_scan` call finished, including its asynchronous phase if any.
    PageScanned,
    /// An activation this vendor took part in was arbitrated.
    Click {
        link: LinkId,
        /// Vendor that rewrote the link, `None` when no vendor did.
        replaced_by: Option<String>,
    },
}

impl RewriterEvent {
    pub fn click(link: LinkId, replaced_by: Option<&str>) -> Self {
        Self::Click {
            link,
            replaced_by: replaced_by.map(str::to_string),
        }
    }
}
