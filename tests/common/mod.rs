#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;

use link_arbiter::domain::ports::{
    ClassificationBackend, ClassificationRequest, ClassificationResponse,
};
use link_arbiter::error::ClassifyError;
use link_arbiter::prelude::*;

pub const PAGE_URL: &str = "https://blog.example/post";
pub const WAYPOINT: &str = "https://go.example/";

/// Backend that holds every answer until [`GatedBackend::release`] is called.
pub struct GatedBackend {
    merchants: HashSet<String>,
    gate: Semaphore,
    requests: Mutex<Vec<ClassificationRequest>>,
}

impl GatedBackend {
    pub fn new(merchants: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            merchants: merchants.iter().map(|m| m.to_string()).collect(),
            gate: Semaphore::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Lets every pending and future request complete.
    pub fn release(&self) {
        self.gate.add_permits(1024);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requested_domains(&self) -> Vec<Vec<String>> {
        self.requests
            .lock()
            .iter()
            .map(|request| request.domains.clone())
            .collect()
    }
}

#[async_trait]
impl ClassificationBackend for GatedBackend {
    async fn classify(
        &self,
        request: ClassificationRequest,
    ) -> Result<ClassificationResponse, ClassifyError> {
        self.requests.lock().push(request.clone());

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;
        permit.forget();

        Ok(ClassificationResponse::new(
            request
                .domains
                .into_iter()
                .filter(|domain| self.merchants.contains(domain))
                .collect(),
        ))
    }
}

pub fn waypoint() -> WaypointUrlBuilder {
    WaypointUrlBuilder::new(WAYPOINT, "acc").unwrap()
}

pub fn resolver_options() -> ResolverOptions {
    ResolverOptions {
        account_id: "acc".to_string(),
        page_url: PAGE_URL.to_string(),
        ..ResolverOptions::default()
    }
}

pub fn cache_with(backend: Arc<dyn ClassificationBackend>) -> DomainResolutionCache {
    DomainResolutionCache::new(backend, waypoint(), resolver_options())
}

pub fn static_cache(merchants: &[&str]) -> (DomainResolutionCache, Arc<StaticClassificationBackend>) {
    let backend = Arc::new(StaticClassificationBackend::new(merchants));
    (cache_with(backend.clone()), backend)
}

/// Page with one `<a>` per destination; ids follow the given order.
pub fn page_with(hrefs: &[&str]) -> (Arc<InMemoryPage>, Vec<LinkId>) {
    let page = Arc::new(InMemoryPage::new(PAGE_URL));
    let ids = hrefs.iter().map(|href| page.add_link(href)).collect();
    (page, ids)
}

/// Resolver that leaves every link alone.
pub fn keep_all(links: &[Anchor]) -> TwoStepResponse {
    TwoStepResponse::from_sync(links.iter().map(|a| RewriteRecord::keep(a.id)).collect())
}

/// Resolver that rewrites every link to `<base>?link=<id>`.
pub fn replace_all(base: &'static str) -> impl Fn(&[Anchor]) -> TwoStepResponse + Send + Sync {
    move |links: &[Anchor]| {
        TwoStepResponse::from_sync(
            links
                .iter()
                .map(|a| RewriteRecord::replace(a.id, format!("{base}?link={}", a.id.get())))
                .collect(),
        )
    }
}

pub fn rewriter(page: Arc<InMemoryPage>, resolver: impl LinkResolver + 'static) -> LinkRewriter {
    LinkRewriter::new(
        "vendor",
        Arc::new(resolver),
        page,
        LinkRewriterOptions::default(),
    )
    .unwrap()
}

/// Drains every event received so far.
pub fn drain(events: &mut tokio::sync::broadcast::Receiver<RewriterEvent>) -> Vec<RewriterEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
