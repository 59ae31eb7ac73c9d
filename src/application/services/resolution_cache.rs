//! Per-vendor domain classification cache with single-flight batching.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::domain::entities::{
    Anchor, DomainStatus, LinkClassification, RewriteRecord, TwoStepResponse,
};
use crate::domain::ports::{
    ClassificationBackend, ClassificationRequest, ClassificationResponse, LinkResolver,
};
use crate::error::{ArbiterError, ClassifyError};
use crate::utils::extract_domain::domain_from_href;
use crate::utils::waypoint::WaypointUrlBuilder;

/// A classification request that any number of callers can await.
pub type SharedClassification =
    Shared<BoxFuture<'static, Result<Arc<ClassificationResponse>, ClassifyError>>>;

/// Out-of-band consumer of full backend responses (extra fields included).
pub type ResponseCallback = Arc<dyn Fn(&ClassificationResponse) + Send + Sync>;

type Settlement = Shared<BoxFuture<'static, Result<(), ClassifyError>>>;

/// Settings of one vendor's resolution cache.
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    /// Account the backend classifies for.
    pub account_id: String,
    /// URL of the page the links live on. Its host is always excluded.
    pub page_url: String,
    /// Domains that classify as `IGNORE` without asking the backend.
    pub excluded_domains: Vec<String>,
    /// When true, a failed request forgets its domains so a later call asks again.
    /// When false they stay `UNKNOWN` (optimistic) for the cache's lifetime.
    pub retry_failed_domains: bool,
}

/// Domain → status cache for one vendor, implementing the resolver contract.
///
/// # Single-flight
///
/// Every domain that needs a backend answer is written as
/// [`DomainStatus::Unknown`] *before* the request is issued. Later calls see the
/// entry, do not ask again, and serve links on that domain optimistically from
/// the synchronous batch.
///
/// # Classification policy
///
/// | Cache state              | Replacement URL |
/// |--------------------------|-----------------|
/// | `AFFILIATE`              | waypoint URL    |
/// | `UNKNOWN` / not cached   | waypoint URL    |
/// | `NON_AFFILIATE`/`IGNORE` | none            |
///
/// Cloning is cheap; clones share the same cache.
#[derive(Clone)]
pub struct DomainResolutionCache {
    backend: Arc<dyn ClassificationBackend>,
    waypoint: WaypointUrlBuilder,
    account_id: String,
    page_url: String,
    excluded: Arc<HashSet<String>>,
    retry_failed_domains: bool,
    domains: Arc<Mutex<HashMap<String, DomainStatus>>>,
    first_request: Arc<Mutex<Option<SharedClassification>>>,
    on_response: Option<ResponseCallback>,
}

impl DomainResolutionCache {
    /// Creates an empty cache.
    ///
    /// The host of `options.page_url` is added to the exclusion set.
    pub fn new(
        backend: Arc<dyn ClassificationBackend>,
        waypoint: WaypointUrlBuilder,
        options: ResolverOptions,
    ) -> Self {
        let mut excluded: HashSet<String> = options
            .excluded_domains
            .iter()
            .map(|domain| domain.trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|domain| !domain.is_empty())
            .collect();

        if let Some(page_domain) = domain_from_href(&options.page_url) {
            excluded.insert(page_domain);
        }

        debug!(
            account_id = %options.account_id,
            excluded = excluded.len(),
            "Resolution cache created"
        );

        Self {
            backend,
            waypoint,
            account_id: options.account_id,
            page_url: options.page_url,
            excluded: Arc::new(excluded),
            retry_failed_domains: options.retry_failed_domains,
            domains: Arc::new(Mutex::new(HashMap::new())),
            first_request: Arc::new(Mutex::new(None)),
            on_response: None,
        }
    }

    /// Registers a consumer for full backend responses.
    ///
    /// Called once per successful request, before the cache is updated.
    pub fn with_response_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ClassificationResponse) + Send + Sync + 'static,
    {
        self.on_response = Some(Arc::new(callback));
        self
    }

    /// Classifies `links` and returns their rewrite records in two steps.
    ///
    /// - `sync_response` covers every input link, in input order, using what the
    ///   cache knows now (new domains count as `UNKNOWN`).
    /// - `async_response` is present only if a request had to be issued; it
    ///   resolves to fresh records for the links whose domain was requested.
    ///
    /// At most one request is issued per call and it only contains domains no
    /// earlier call has already asked for.
    pub fn resolve_domains(&self, links: &[Anchor]) -> TwoStepResponse {
        let domains_to_ask = self.mark_new_domains(links);
        let sync_response = self.rewrite_records(links);

        if domains_to_ask.is_empty() {
            debug!(links = links.len(), "All domains served from cache");
            return TwoStepResponse::from_sync(sync_response);
        }

        let asked: HashSet<&str> = domains_to_ask.iter().map(String::as_str).collect();
        let pending: Vec<Anchor> = links
            .iter()
            .filter(|anchor| {
                domain_from_href(&anchor.href).is_some_and(|domain| asked.contains(domain.as_str()))
            })
            .cloned()
            .collect();

        let settlement = self.settle_async(domains_to_ask);
        let cache = self.clone();
        let async_response = async move {
            settlement.await.map_err(ArbiterError::Network)?;
            Ok::<_, ArbiterError>(cache.rewrite_records(&pending))
        };

        TwoStepResponse::from_sync(sync_response).with_async(async_response)
    }

    /// The very first request this cache issued, if any.
    ///
    /// Lets other components wait for that request instead of issuing their own.
    pub fn first_request(&self) -> Option<SharedClassification> {
        self.first_request.lock().clone()
    }

    /// Current status of a domain, `None` if the cache has never seen it.
    pub fn domain_status(&self, domain: &str) -> Option<DomainStatus> {
        let domain = domain.to_ascii_lowercase();
        if self.is_excluded(&domain) {
            return Some(DomainStatus::Ignore);
        }
        self.domains.lock().get(&domain).copied()
    }

    /// Records a known status for a domain, e.g. from a persisted previous session.
    ///
    /// Returns false (and changes nothing) if `status` is `Unknown`, which only
    /// a request in flight may set, or if the domain already has a terminal
    /// status.
    pub fn record_status(&self, domain: &str, status: DomainStatus) -> bool {
        if !status.is_terminal() {
            return false;
        }

        let domain = domain.to_ascii_lowercase();
        let mut domains = self.domains.lock();

        if domains.get(&domain).is_some_and(|known| known.is_terminal()) {
            return false;
        }

        domains.insert(domain, status);
        true
    }

    /// Snapshot of every cached domain.
    pub fn snapshot(&self) -> HashMap<String, DomainStatus> {
        self.domains.lock().clone()
    }

    /// Where a link's domain stands right now.
    pub fn classify(&self, anchor: &Anchor) -> LinkClassification {
        let Some(domain) = domain_from_href(&anchor.href) else {
            return LinkClassification::Resolved(DomainStatus::Ignore);
        };

        if self.is_excluded(&domain) {
            return LinkClassification::Resolved(DomainStatus::Ignore);
        }

        LinkClassification::from(self.domains.lock().get(&domain).copied())
    }

    fn is_excluded(&self, domain: &str) -> bool {
        self.excluded.contains(domain)
    }

    /// Collects the deduplicated domains nobody has asked about yet and marks
    /// them `UNKNOWN` under the same lock.
    fn mark_new_domains(&self, links: &[Anchor]) -> Vec<String> {
        let mut domains = self.domains.lock();
        let mut domains_to_ask: Vec<String> = Vec::new();

        for anchor in links {
            let Some(domain) = domain_from_href(&anchor.href) else {
                continue;
            };

            if self.is_excluded(&domain)
                || domains.contains_key(&domain)
                || domains_to_ask.contains(&domain)
            {
                continue;
            }

            domains_to_ask.push(domain);
        }

        for domain in &domains_to_ask {
            domains.insert(domain.clone(), DomainStatus::Unknown);
        }

        domains_to_ask
    }

    fn rewrite_records(&self, links: &[Anchor]) -> Vec<RewriteRecord> {
        links
            .iter()
            .map(|anchor| {
                if self.classify(anchor).is_replaceable() {
                    RewriteRecord::replace(anchor.id, self.waypoint.build(&anchor.href))
                } else {
                    RewriteRecord::keep(anchor.id)
                }
            })
            .collect()
    }

    /// Issues the request for `domains` and returns a future that completes once
    /// the cache has been updated from its outcome.
    ///
    /// The update runs on a spawned task when a Tokio runtime is available, so it
    /// happens even if nobody awaits the asynchronous batch.
    fn settle_async(&self, domains: Vec<String>) -> Settlement {
        let request = self.issue_request(domains.clone());
        let cache = self.clone();

        let settlement = request
            .map(move |outcome| cache.apply_outcome(&domains, outcome))
            .boxed()
            .shared();

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(settlement.clone());
        }

        settlement
    }

    fn issue_request(&self, domains: Vec<String>) -> SharedClassification {
        info!(
            account_id = %self.account_id,
            domains = ?domains,
            "Requesting domain classification"
        );

        let request = ClassificationRequest {
            account_id: self.account_id.clone(),
            domains,
            page_url: self.page_url.clone(),
        };

        let backend = Arc::clone(&self.backend);
        let shared = async move { backend.classify(request).await.map(Arc::new) }
            .boxed()
            .shared();

        let mut first = self.first_request.lock();
        if first.is_none() {
            *first = Some(shared.clone());
        }

        shared
    }

    fn apply_outcome(
        &self,
        requested: &[String],
        outcome: Result<Arc<ClassificationResponse>, ClassifyError>,
    ) -> Result<(), ClassifyError> {
        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                warn!(domains = ?requested, error = %e, "Domain classification failed");
                if self.retry_failed_domains {
                    let mut domains = self.domains.lock();
                    for domain in requested {
                        if domains.get(domain) == Some(&DomainStatus::Unknown) {
                            domains.remove(domain);
                        }
                    }
                }
                return Err(e);
            }
        };

        if let Some(callback) = &self.on_response {
            callback(response.as_ref());
        }

        let merchants: HashSet<String> = response
            .merchant_domains
            .iter()
            .map(|domain| domain.to_ascii_lowercase())
            .collect();

        let mut domains = self.domains.lock();
        let mut affiliates = 0;

        for domain in requested {
            if domains.get(domain).is_some_and(|known| known.is_terminal()) {
                continue;
            }

            let status = if merchants.contains(domain) {
                affiliates += 1;
                DomainStatus::Affiliate
            } else {
                DomainStatus::NonAffiliate
            };
            domains.insert(domain.clone(), status);
        }

        info!(
            requested = requested.len(),
            affiliates, "Domain classification settled"
        );

        Ok(())
    }
}

impl LinkResolver for DomainResolutionCache {
    fn resolve_unknown_links(&self, links: &[Anchor]) -> TwoStepResponse {
        self.resolve_domains(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::LinkId;
    use crate::domain::ports::MockClassificationBackend;

    fn waypoint() -> WaypointUrlBuilder {
        WaypointUrlBuilder::new("https://w.example/", "acc").unwrap()
    }

    fn options() -> ResolverOptions {
        ResolverOptions {
            account_id: "acc".to_string(),
            page_url: "https://blog.example/post".to_string(),
            excluded_domains: vec!["Excluded.COM".to_string()],
            retry_failed_domains: false,
        }
    }

    fn cache_with(backend: MockClassificationBackend) -> DomainResolutionCache {
        DomainResolutionCache::new(Arc::new(backend), waypoint(), options())
    }

    #[tokio::test]
    async fn test_excluded_and_page_domains_are_ignored_without_request() {
        let mut backend = MockClassificationBackend::new();
        backend.expect_classify().never();
        let cache = cache_with(backend);

        let links = [
            Anchor::new(LinkId::new(1), "https://excluded.com/x"),
            Anchor::new(LinkId::new(2), "https://blog.example/other-post"),
            Anchor::new(LinkId::new(3), "mailto:me@a.com"),
        ];
        let response = cache.resolve_domains(&links);

        assert!(response.async_response.is_none());
        let sync = response.sync_response.unwrap();
        assert_eq!(sync.len(), 3);
        assert!(sync.iter().all(|record| record.replacement_url.is_none()));
        assert_eq!(cache.domain_status("excluded.com"), Some(DomainStatus::Ignore));
    }

    #[tokio::test]
    async fn test_new_domains_are_marked_unknown_before_request() {
        let mut backend = MockClassificationBackend::new();
        backend
            .expect_classify()
            .times(1)
            .returning(|_| Ok(ClassificationResponse::new(vec!["a.com".to_string()])));
        let cache = cache_with(backend);

        let response = cache.resolve_domains(&[Anchor::new(LinkId::new(1), "https://a.com/")]);

        assert_eq!(cache.domain_status("a.com"), Some(DomainStatus::Unknown));
        let sync = response.sync_response.unwrap();
        assert!(sync[0].replacement_url.is_some());

        let records = response.async_response.unwrap().await.unwrap();
        assert!(records[0].replacement_url.is_some());
        assert_eq!(cache.domain_status("a.com"), Some(DomainStatus::Affiliate));
    }

    #[tokio::test]
    async fn test_request_contains_deduplicated_domains() {
        let mut backend = MockClassificationBackend::new();
        backend
            .expect_classify()
            .withf(|request| {
                request.domains == vec!["a.com".to_string(), "b.com".to_string()]
                    && request.account_id == "acc"
                    && request.page_url == "https://blog.example/post"
            })
            .times(1)
            .returning(|_| Ok(ClassificationResponse::default()));
        let cache = cache_with(backend);

        let links = [
            Anchor::new(LinkId::new(1), "https://a.com/1"),
            Anchor::new(LinkId::new(2), "https://B.com/"),
            Anchor::new(LinkId::new(3), "https://a.com/2"),
        ];
        let response = cache.resolve_domains(&links);
        response.async_response.unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_merchant_domains_are_matched_case_insensitively() {
        let mut backend = MockClassificationBackend::new();
        backend
            .expect_classify()
            .returning(|_| Ok(ClassificationResponse::new(vec!["A.COM".to_string()])));
        let cache = cache_with(backend);

        let response = cache.resolve_domains(&[Anchor::new(LinkId::new(1), "https://a.com/")]);
        response.async_response.unwrap().await.unwrap();

        assert_eq!(cache.domain_status("a.com"), Some(DomainStatus::Affiliate));
    }

    #[tokio::test]
    async fn test_failed_request_keeps_domains_unknown() {
        let mut backend = MockClassificationBackend::new();
        backend
            .expect_classify()
            .times(1)
            .returning(|_| Err(ClassifyError::Transport("connection reset".to_string())));
        let cache = cache_with(backend);

        let response = cache.resolve_domains(&[Anchor::new(LinkId::new(1), "https://a.com/")]);
        let result = response.async_response.unwrap().await;

        assert!(matches!(result, Err(ArbiterError::Network(_))));
        assert_eq!(cache.domain_status("a.com"), Some(DomainStatus::Unknown));

        // Quarantined: a later call does not ask again and stays optimistic.
        let again = cache.resolve_domains(&[Anchor::new(LinkId::new(2), "https://a.com/other")]);
        assert!(again.async_response.is_none());
        assert!(again.sync_response.unwrap()[0].replacement_url.is_some());
    }

    #[tokio::test]
    async fn test_failed_request_is_retried_when_enabled() {
        let mut backend = MockClassificationBackend::new();
        let mut seq = mockall::Sequence::new();
        backend
            .expect_classify()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(ClassifyError::Decode("bad json".to_string())));
        backend
            .expect_classify()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ClassificationResponse::default()));

        let cache = DomainResolutionCache::new(
            Arc::new(backend),
            waypoint(),
            ResolverOptions {
                retry_failed_domains: true,
                ..options()
            },
        );

        let first = cache.resolve_domains(&[Anchor::new(LinkId::new(1), "https://a.com/")]);
        assert!(first.async_response.unwrap().await.is_err());
        assert_eq!(cache.domain_status("a.com"), None);

        let second = cache.resolve_domains(&[Anchor::new(LinkId::new(2), "https://a.com/")]);
        let records = second.async_response.unwrap().await.unwrap();
        assert!(records[0].replacement_url.is_none());
        assert_eq!(cache.domain_status("a.com"), Some(DomainStatus::NonAffiliate));
    }

    #[tokio::test]
    async fn test_response_callback_receives_extra_fields() {
        let mut backend = MockClassificationBackend::new();
        backend.expect_classify().returning(|_| {
            let mut response = ClassificationResponse::new(vec![]);
            response
                .extra
                .insert("guid".to_string(), serde_json::json!("visitor-1"));
            Ok(response)
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cache = cache_with(backend).with_response_callback(move |response| {
            sink.lock().push(response.extra.get("guid").cloned());
        });

        let response = cache.resolve_domains(&[Anchor::new(LinkId::new(1), "https://a.com/")]);
        response.async_response.unwrap().await.unwrap();

        assert_eq!(*seen.lock(), vec![Some(serde_json::json!("visitor-1"))]);
    }

    #[tokio::test]
    async fn test_first_request_is_memoized() {
        let mut backend = MockClassificationBackend::new();
        backend
            .expect_classify()
            .times(2)
            .returning(|request| Ok(ClassificationResponse::new(request.domains)));
        let cache = cache_with(backend);

        assert!(cache.first_request().is_none());

        let first = cache.resolve_domains(&[Anchor::new(LinkId::new(1), "https://a.com/")]);
        first.async_response.unwrap().await.unwrap();
        let second = cache.resolve_domains(&[Anchor::new(LinkId::new(2), "https://b.com/")]);
        second.async_response.unwrap().await.unwrap();

        let memo = cache.first_request().unwrap().await.unwrap();
        assert_eq!(memo.merchant_domains, vec!["a.com"]);
    }

    #[test]
    fn test_record_status_never_overrides_terminal_state() {
        let cache = cache_with(MockClassificationBackend::new());

        assert!(cache.record_status("a.com", DomainStatus::NonAffiliate));
        assert!(!cache.record_status("a.com", DomainStatus::Affiliate));
        assert_eq!(cache.domain_status("A.com"), Some(DomainStatus::NonAffiliate));
    }

    #[test]
    fn test_unknown_status_is_not_recorded() {
        let cache = cache_with(MockClassificationBackend::new());

        assert!(!cache.record_status("a.com", DomainStatus::Unknown));
        assert_eq!(cache.domain_status("a.com"), None);

        // Still new, so it gets asked about.
        let response = cache.resolve_domains(&[Anchor::new(LinkId::new(1), "https://a.com/")]);
        assert!(response.async_response.is_some());
        assert_eq!(cache.domain_status("a.com"), Some(DomainStatus::Unknown));
    }

    #[test]
    fn test_classify_link() {
        let cache = cache_with(MockClassificationBackend::new());
        cache.record_status("b.com", DomainStatus::NonAffiliate);
        // Outside a runtime the request is built but never sent.
        drop(cache.resolve_domains(&[Anchor::new(LinkId::new(9), "https://c.com/")]));

        assert_eq!(
            cache.classify(&Anchor::new(LinkId::new(1), "https://a.com/")),
            LinkClassification::Unresolved
        );
        assert_eq!(
            cache.classify(&Anchor::new(LinkId::new(2), "https://b.com/")),
            LinkClassification::Resolved(DomainStatus::NonAffiliate)
        );
        assert_eq!(
            cache.classify(&Anchor::new(LinkId::new(3), "https://c.com/")),
            LinkClassification::Pending
        );
        assert_eq!(
            cache.classify(&Anchor::new(LinkId::new(4), "/relative")),
            LinkClassification::Resolved(DomainStatus::Ignore)
        );
    }

    #[test]
    fn test_sync_records_follow_input_order() {
        let cache = cache_with(MockClassificationBackend::new());
        cache.record_status("a.com", DomainStatus::Affiliate);
        cache.record_status("b.com", DomainStatus::NonAffiliate);

        let links = [
            Anchor::new(LinkId::new(10), "https://b.com/"),
            Anchor::new(LinkId::new(11), "https://a.com/"),
        ];
        let sync = cache.resolve_domains(&links).sync_response.unwrap();

        assert_eq!(sync[0], RewriteRecord::keep(LinkId::new(10)));
        assert_eq!(
            sync[1],
            RewriteRecord::replace(LinkId::new(11), waypoint().build("https://a.com/"))
        );
    }
}
