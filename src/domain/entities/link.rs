//! Link handle and link snapshot entities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity-stable handle to one link control in the page.
///
/// The host assigns a handle the first time it sees a control and keeps
/// returning the same handle for it, so the core can key its maps on the
/// handle instead of on the control itself. The core never owns the control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(u64);

impl LinkId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

impl From<u64> for LinkId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// A link as seen during one page scan: its handle and its destination at that time.
///
/// Resolvers receive anchors rather than bare handles so they can classify the
/// destination without calling back into the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub id: LinkId,
    pub href: String,
}

impl Anchor {
    /// Creates a new anchor snapshot.
    pub fn new(id: LinkId, href: impl Into<String>) -> Self {
        Self {
            id,
            href: href.into(),
        }
    }
}
