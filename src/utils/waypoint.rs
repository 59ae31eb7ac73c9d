//! Replacement (waypoint) URL construction.

use url::Url;

/// Default redirect service used when none is configured.
pub const DEFAULT_WAYPOINT_URL: &str = "https://go.redirectingat.com/";

/// Builds the URL a link is rewritten to: a redirect service that records the
/// click for `account_id` and forwards to the original destination.
///
/// Produces `<base>?id=<account_id>&url=<original>[&sref=<page_url>]` with
/// every value query-encoded. Existing query parameters of `base` are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaypointUrlBuilder {
    base: Url,
    account_id: String,
    page_url: Option<String>,
}

impl WaypointUrlBuilder {
    /// Creates a builder for `account_id` on top of `base`.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if `base` is not an absolute URL.
    pub fn new(base: &str, account_id: impl Into<String>) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base)?,
            account_id: account_id.into(),
            page_url: None,
        })
    }

    /// Adds the referring page to every generated URL.
    pub fn with_page_url(mut self, page_url: impl Into<String>) -> Self {
        let page_url = page_url.into();
        self.page_url = (!page_url.is_empty()).then_some(page_url);
        self
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Replacement URL for a link pointing at `original`.
    pub fn build(&self, original: &str) -> String {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("id", &self.account_id);
            query.append_pair("url", original);
            if let Some(page_url) = &self.page_url {
                query.append_pair("sref", page_url);
            }
        }
        url.to_string()
    }
}
