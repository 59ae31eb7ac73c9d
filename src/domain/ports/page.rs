//! Page access trait implemented by the host environment.

use crate::domain::entities::{Anchor, LinkId};

/// Name of the per-link attribute listing the vendors allowed to rewrite it, in order.
pub const LINK_PRIORITY_ATTRIBUTE: &str = "data-link-rewriters";

/// Selector used when a vendor does not configure one.
pub const DEFAULT_LINK_SELECTOR: &str = "a";

/// DOM primitives the core needs from the host.
///
/// The core holds only [`LinkId`] handles; it asks the page for the current
/// destination of a handle whenever it needs it and never caches controls.
/// Implementations must return the same handle for the same control across calls.
///
/// # Implementations
///
/// - [`crate::infrastructure::page::InMemoryPage`] - Arena-backed page for tools and tests
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
pub trait Page: Send + Sync {
    /// Links currently attached to the page that match `selector`, in document order.
    fn query_links(&self, selector: &str) -> Vec<Anchor>;

    /// Current destination of a link, `None` if the handle is unknown.
    fn href(&self, link: LinkId) -> Option<String>;

    /// Overwrites the destination of a link. Unknown handles are ignored.
    fn set_href(&self, link: LinkId, href: &str);

    /// Reads an attribute of a link.
    fn attribute(&self, link: LinkId, name: &str) -> Option<String>;
}
