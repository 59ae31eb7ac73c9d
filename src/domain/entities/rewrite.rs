//! Per-link rewrite decisions.

use super::domain_status::DomainStatus;
use super::link::LinkId;

/// A vendor's decision for one link.
///
/// `replacement_url: None` means "do not rewrite this link".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRecord {
    pub link: LinkId,
    pub replacement_url: Option<String>,
}

impl RewriteRecord {
    pub fn new(link: LinkId, replacement_url: Option<String>) -> Self {
        Self {
            link,
            replacement_url,
        }
    }

    /// Record that rewrites `link` to `url`.
    pub fn replace(link: LinkId, url: impl Into<String>) -> Self {
        Self::new(link, Some(url.into()))
    }

    /// Record that leaves `link` untouched.
    pub fn keep(link: LinkId) -> Self {
        Self::new(link, None)
    }
}

/// State of one watched link inside a [`LinkRewriter`](crate::application::services::LinkRewriter).
///
/// Absence from the map is the implicit "unseen" state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorState {
    /// Discovered by a scan, no decision from the resolver yet.
    Pending,
    /// The resolver has produced a decision.
    Resolved { replacement_url: Option<String> },
}

impl AnchorState {
    pub fn replacement_url(&self) -> Option<&str> {
        match self {
            Self::Pending => None,
            Self::Resolved { replacement_url } => replacement_url.as_deref(),
        }
    }
}

impl From<RewriteRecord> for AnchorState {
    fn from(record: RewriteRecord) -> Self {
        Self::Resolved {
            replacement_url: record.replacement_url,
        }
    }
}

/// Where a link's domain stands in a resolution cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkClassification {
    /// The domain has never been seen by the cache.
    Unresolved,
    /// A classification request covering the domain is outstanding.
    Pending,
    /// The domain has a terminal status.
    Resolved(DomainStatus),
}

impl LinkClassification {
    /// Unresolved and pending links are optimistically treated as affiliate
    /// candidates so no legitimate affiliate click is lost while waiting.
    pub fn is_replaceable(self) -> bool {
        match self {
            Self::Unresolved | Self::Pending => true,
            Self::Resolved(status) => status.is_replaceable(),
        }
    }
}

impl From<Option<DomainStatus>> for LinkClassification {
    fn from(status: Option<DomainStatus>) -> Self {
        match status {
            None => Self::Unresolved,
            Some(DomainStatus::Unknown) => Self::Pending,
            Some(status) => Self::Resolved(status),
        }
    }
}

/// Answer of [`LinkRewriter::get_replacement_url`](crate::application::services::LinkRewriter::get_replacement_url).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementLookup {
    /// Out of the vendor's selector scope, or not scanned yet.
    NotWatched,
    /// Watched, waiting for the resolver.
    Pending,
    /// Watched, the vendor does not rewrite this link.
    Unchanged,
    /// Watched, the vendor rewrites this link to the given URL.
    Replace(String),
}

impl ReplacementLookup {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Replace(url) => Some(url),
            _ => None,
        }
    }

    pub fn is_watched(&self) -> bool {
        !matches!(self, Self::NotWatched)
    }
}

impl From<Option<&AnchorState>> for ReplacementLookup {
    fn from(state: Option<&AnchorState>) -> Self {
        match state {
            None => Self::NotWatched,
            Some(AnchorState::Pending) => Self::Pending,
            Some(AnchorState::Resolved {
                replacement_url: None,
            }) => Self::Unchanged,
            Some(AnchorState::Resolved {
                replacement_url: Some(url),
            }) => Self::Replace(url.clone()),
        }
    }
}
