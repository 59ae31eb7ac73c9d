//! Affiliate classification of a destination domain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a domain, scoped to one vendor's cache.
///
/// `Unknown` is the only non-terminal value: it marks a domain whose
/// classification request is in flight (or about to be sent). Every other
/// value is terminal and never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainStatus {
    Affiliate,
    NonAffiliate,
    Ignore,
    Unknown,
}

impl DomainStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Whether links on this domain are assigned a replacement URL.
    ///
    /// `Unknown` counts as an affiliate candidate until resolved otherwise.
    pub fn is_replaceable(self) -> bool {
        matches!(self, Self::Affiliate | Self::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Affiliate => "AFFILIATE",
            Self::NonAffiliate => "NON_AFFILIATE",
            Self::Ignore => "IGNORE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
