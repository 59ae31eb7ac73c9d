//! Classification backend with a fixed merchant set.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::ports::{ClassificationBackend, ClassificationRequest, ClassificationResponse};
use crate::error::ClassifyError;

/// A backend that answers from a fixed merchant set without any I/O.
///
/// Used by the CLI for page fixtures that declare their merchants, and by tests
/// that need to count requests, delay answers or simulate failures.
#[derive(Default)]
pub struct StaticClassificationBackend {
    merchants: HashSet<String>,
    extra: Map<String, Value>,
    latency: Option<Duration>,
    failure: Option<ClassifyError>,
    requests: Mutex<Vec<ClassificationRequest>>,
}

impl StaticClassificationBackend {
    pub fn new<I, S>(merchants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            merchants: merchants
                .into_iter()
                .map(|domain| domain.as_ref().to_ascii_lowercase())
                .collect(),
            ..Self::default()
        }
    }

    /// Delays every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Adds a field to every response, next to `merchantDomains`.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Fails every request with `error`.
    pub fn failing(mut self, error: ClassifyError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<ClassificationRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ClassificationBackend for StaticClassificationBackend {
    async fn classify(
        &self,
        request: ClassificationRequest,
    ) -> Result<ClassificationResponse, ClassifyError> {
        debug!(domains = ?request.domains, "Static classification");
        self.requests.lock().push(request.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let merchant_domains = request
            .domains
            .into_iter()
            .filter(|domain| self.merchants.contains(&domain.to_ascii_lowercase()))
            .collect();

        Ok(ClassificationResponse {
            merchant_domains,
            extra: self.extra.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(domains: &[&str]) -> ClassificationRequest {
        ClassificationRequest {
            account_id: "acc".to_string(),
            domains: domains.iter().map(|d| d.to_string()).collect(),
            page_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_answers_with_requested_merchants_only() {
        let backend = StaticClassificationBackend::new(["A.com", "c.com"]);

        let response = backend.classify(request(&["a.com", "b.com"])).await.unwrap();

        assert_eq!(response.merchant_domains, vec!["a.com"]);
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_extra_fields() {
        let backend = StaticClassificationBackend::new(["a.com"]).with_extra("guid", json!("g-1"));

        let response = backend.classify(request(&["a.com"])).await.unwrap();

        assert_eq!(response.extra.get("guid"), Some(&json!("g-1")));
    }

    #[tokio::test]
    async fn test_failing_backend_still_records_request() {
        let backend = StaticClassificationBackend::new(Vec::<String>::new())
            .failing(ClassifyError::Status {
                status: 503,
                body: "busy".to_string(),
            });

        let result = backend.classify(request(&["a.com"])).await;

        assert!(matches!(result, Err(ClassifyError::Status { status: 503, .. })));
        assert_eq!(backend.requests()[0].domains, vec!["a.com"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency() {
        let backend = StaticClassificationBackend::new(["a.com"]).with_latency(Duration::from_secs(2));
        let started = tokio::time::Instant::now();

        backend.classify(request(&["a.com"])).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
