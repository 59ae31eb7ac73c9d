//! Classification backend trait and wire types.

use crate::error::ClassifyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One batched classification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRequest {
    pub account_id: String,
    pub domains: Vec<String>,
    pub page_url: String,
}

/// Backend answer: the subset of requested domains that are merchants.
///
/// Any other field is kept in `extra` untouched and handed to the
/// out-of-band response callback of the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResponse {
    #[serde(default)]
    pub merchant_domains: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClassificationResponse {
    pub fn new(merchant_domains: Vec<String>) -> Self {
        Self {
            merchant_domains,
            extra: Map::new(),
        }
    }
}

/// Network collaborator that classifies domains for one account.
///
/// Implementations should not retry on their own; the core issues at most one
/// outstanding request per domain and leaves retry policy to the host.
///
/// # Implementations
///
/// - [`crate::infrastructure::classifier::HttpClassificationBackend`] - HTTP JSON endpoint
/// - [`crate::infrastructure::classifier::StaticClassificationBackend`] - Fixed merchant set
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassificationBackend: Send + Sync {
    /// Classifies every domain of `request`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if the request cannot be sent, the backend
    /// answers with a non-success status, or the body cannot be decoded.
    async fn classify(
        &self,
        request: ClassificationRequest,
    ) -> Result<ClassificationResponse, ClassifyError>;
}
