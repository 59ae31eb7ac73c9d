//! HTTP classification backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::ports::{ClassificationBackend, ClassificationRequest, ClassificationResponse};
use crate::error::ClassifyError;

/// Classification backend reached over HTTP.
///
/// Each request is a `GET <endpoint>?data=<json>` where `<json>` is the
/// serialized [`ClassificationRequest`]. The body of a successful response is
/// decoded as a [`ClassificationResponse`].
pub struct HttpClassificationBackend {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpClassificationBackend {
    /// Creates a backend for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Transport`] if the endpoint is not an absolute
    /// URL or the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ClassifyError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ClassifyError::Transport(format!("invalid endpoint '{endpoint}': {e}")))?;

        let client = Client::builder()
            .build()
            .map_err(|e| ClassifyError::Transport(format!("failed to build HTTP client: {e}")))?;

        info!("Classification backend at {}", endpoint);

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_url(&self, request: &ClassificationRequest) -> Result<Url, ClassifyError> {
        let data = serde_json::to_string(request)
            .map_err(|e| ClassifyError::Transport(format!("failed to encode request: {e}")))?;

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("data", &data);
        Ok(url)
    }
}

#[async_trait]
impl ClassificationBackend for HttpClassificationBackend {
    async fn classify(
        &self,
        request: ClassificationRequest,
    ) -> Result<ClassificationResponse, ClassifyError> {
        let url = self.request_url(&request)?;
        debug!(domains = request.domains.len(), "GET {}", self.endpoint);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Classification backend returned {}", status);
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ClassificationResponse>()
            .await
            .map_err(|e| ClassifyError::Decode(e.to_string()))
    }
}
