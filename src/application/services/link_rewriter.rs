//! Per-vendor link watcher and rewriter.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::entities::{
    Anchor, AnchorState, AsyncRecords, LinkId, ReplacementLookup, RewriteRecord,
};
use crate::domain::events::RewriterEvent;
use crate::domain::ports::{DEFAULT_LINK_SELECTOR, LinkResolver, Page};
use crate::error::ArbiterError;
use crate::utils::extract_domain::is_absolute_url;
use crate::utils::selector::Selector;

/// How long a rewritten `href` stays in place before the original is put back.
pub const DEFAULT_RESTORE_DELAY: Duration = Duration::from_millis(300);

const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Vendor-supplied settings of a [`LinkRewriter`].
#[derive(Debug, Clone)]
pub struct LinkRewriterOptions {
    /// Selector scoping the links this vendor watches. Defaults to every `<a>`.
    pub link_selector: Option<String>,
    /// Delay before a rewritten link gets its original destination back.
    pub restore_delay: Duration,
    /// Buffer size of the event channel handed out by [`LinkRewriter::subscribe`].
    pub event_capacity: usize,
}

impl Default for LinkRewriterOptions {
    fn default() -> Self {
        Self {
            link_selector: None,
            restore_delay: DEFAULT_RESTORE_DELAY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl LinkRewriterOptions {
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.link_selector = Some(selector.into());
        self
    }
}

/// Completion handle of a scan.
///
/// Scans whose resolver answered synchronously are complete when
/// [`LinkRewriter::on_scan`] returns. Otherwise the asynchronous batch is merged
/// by a background task that this handle can await. Dropping the handle does
/// not cancel the task.
#[derive(Debug)]
pub struct ScanHandle {
    task: Option<JoinHandle<Result<(), ArbiterError>>>,
}

impl ScanHandle {
    fn ready() -> Self {
        Self { task: None }
    }

    fn spawned(task: JoinHandle<Result<(), ArbiterError>>) -> Self {
        Self { task: Some(task) }
    }

    /// True while an asynchronous batch has not been merged yet.
    pub fn is_pending(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Waits for the asynchronous batch, if any.
    ///
    /// # Errors
    ///
    /// Returns the error that rejected the asynchronous batch, or
    /// [`ArbiterError::Task`] if the background task panicked.
    pub async fn settled(self) -> Result<(), ArbiterError> {
        match self.task {
            None => Ok(()),
            Some(task) => task
                .await
                .map_err(|e| ArbiterError::Task(e.to_string()))?,
        }
    }
}

/// Authored destinations of links whose rewrite has not been undone yet.
///
/// Rewriters sharing a ledger restore a link to the href it had before the
/// first of several overlapping activations, never to another activation's
/// replacement.
#[derive(Clone, Default)]
pub(crate) struct RestoreLedger {
    state: Arc<Mutex<RestoreState>>,
}

#[derive(Default)]
struct RestoreState {
    next_token: u64,
    pending: HashMap<LinkId, PendingRestore>,
}

struct PendingRestore {
    original: String,
    token: u64,
}

impl RestoreLedger {
    /// Registers a rewrite of `link` away from `current` and returns its token.
    fn begin(&self, link: LinkId, current: String) -> u64 {
        let mut state = self.state.lock();
        state.next_token += 1;
        let token = state.next_token;

        let original = match state.pending.get(&link) {
            Some(pending) => pending.original.clone(),
            None => current,
        };
        state
            .pending
            .insert(link, PendingRestore { original, token });

        token
    }

    /// Takes the href to put back if `token` is still the latest rewrite of `link`.
    fn finish(&self, link: LinkId, token: u64) -> Option<String> {
        let mut state = self.state.lock();
        let latest = state
            .pending
            .get(&link)
            .is_some_and(|pending| pending.token == token);
        if !latest {
            return None;
        }
        state.pending.remove(&link).map(|pending| pending.original)
    }
}

/// A watched link and the scan that started tracking it.
struct TrackedAnchor {
    scan: u64,
    state: AnchorState,
}

struct Inner {
    name: String,
    resolver: Arc<dyn LinkResolver>,
    page: Arc<dyn Page>,
    link_selector: String,
    restore_delay: Duration,
    anchors: Mutex<HashMap<LinkId, TrackedAnchor>>,
    scans: AtomicU64,
    restores: RestoreLedger,
    events: broadcast::Sender<RewriterEvent>,
}

/// One vendor's view of the page.
///
/// Tracks the links matching the vendor's selector, asks the vendor's resolver
/// about links it has not seen before, and answers "what would you rewrite this
/// link to?" at activation time.
///
/// # Link lifecycle
///
/// ```text
/// (unseen) --scan--> Pending --records--> Resolved
///     ^                 |                    |
///     +---- detached ---+--------------------+
/// ```
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct LinkRewriter {
    inner: Arc<Inner>,
}

impl LinkRewriter {
    /// Creates a rewriter for `name`. Nothing is scanned until [`Self::on_scan`].
    ///
    /// # Errors
    ///
    /// Returns [`ArbiterError::Configuration`] if the link selector cannot be
    /// parsed.
    pub fn new(
        name: impl Into<String>,
        resolver: Arc<dyn LinkResolver>,
        page: Arc<dyn Page>,
        options: LinkRewriterOptions,
    ) -> Result<Self, ArbiterError> {
        Self::with_restore_ledger(name, resolver, page, options, RestoreLedger::default())
    }

    pub(crate) fn with_restore_ledger(
        name: impl Into<String>,
        resolver: Arc<dyn LinkResolver>,
        page: Arc<dyn Page>,
        options: LinkRewriterOptions,
        restores: RestoreLedger,
    ) -> Result<Self, ArbiterError> {
        let name = name.into();
        let link_selector = options
            .link_selector
            .unwrap_or_else(|| DEFAULT_LINK_SELECTOR.to_string());

        Selector::parse(&link_selector).map_err(|e| {
            ArbiterError::configuration(format!(
                "invalid link selector '{link_selector}' for vendor '{name}': {e}"
            ))
        })?;

        let (events, _) = broadcast::channel(options.event_capacity.max(1));

        Ok(Self {
            inner: Arc::new(Inner {
                name,
                resolver,
                page,
                link_selector,
                restore_delay: options.restore_delay,
                anchors: Mutex::new(HashMap::new()),
                scans: AtomicU64::new(0),
                restores,
                events,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn link_selector(&self) -> &str {
        &self.inner.link_selector
    }

    /// Scans the page for links matching the selector.
    ///
    /// Links no longer on the page are forgotten. Links seen for the first time
    /// are handed to the resolver in one batch and tracked as pending; the
    /// synchronous records are merged before this returns, the asynchronous ones
    /// by a background task tracked by the returned [`ScanHandle`]. Links already
    /// tracked are never re-resolved.
    ///
    /// # Errors
    ///
    /// Returns [`ArbiterError::Configuration`] if the resolver response has
    /// neither half, or has an asynchronous half while no Tokio runtime is
    /// running. Returns [`ArbiterError::MalformedRecord`] if a synchronous record
    /// names a link that was not requested or carries a non-absolute URL.
    /// On error no state is changed.
    pub fn on_scan(&self) -> Result<ScanHandle, ArbiterError> {
        let mut present = HashSet::new();
        let scanned: Vec<Anchor> = self
            .inner
            .page
            .query_links(&self.inner.link_selector)
            .into_iter()
            .filter(|anchor| present.insert(anchor.id))
            .collect();

        let new_links: Vec<Anchor> = {
            let anchors = self.inner.anchors.lock();
            scanned
                .into_iter()
                .filter(|anchor| !anchors.contains_key(&anchor.id))
                .collect()
        };

        if new_links.is_empty() {
            self.prune(&present);
            debug!(vendor = %self.inner.name, links = present.len(), "Scan found no new links");
            self.emit(RewriterEvent::PageScanned);
            return Ok(ScanHandle::ready());
        }

        let response = self.inner.resolver.resolve_unknown_links(&new_links);
        if !response.is_well_formed() {
            return Err(ArbiterError::configuration(format!(
                "resolver of vendor '{}' returned neither a synchronous nor an asynchronous response",
                self.inner.name
            )));
        }

        let requested: HashSet<LinkId> = new_links.iter().map(|anchor| anchor.id).collect();
        let (sync_records, async_records) = response.into_parts();

        if let Some(records) = &sync_records {
            validate_records(records, &requested)?;
        }

        let runtime = match &async_records {
            Some(_) => Some(tokio::runtime::Handle::try_current().map_err(|_| {
                ArbiterError::configuration(
                    "asynchronous resolver response requires a running Tokio runtime",
                )
            })?),
            None => None,
        };

        let scan = self.inner.scans.fetch_add(1, Ordering::Relaxed);

        let resolved = {
            let mut anchors = self.inner.anchors.lock();
            anchors.retain(|id, _| present.contains(id));

            for anchor in &new_links {
                anchors.insert(
                    anchor.id,
                    TrackedAnchor {
                        scan,
                        state: AnchorState::Pending,
                    },
                );
            }

            let records = sync_records.unwrap_or_default();
            let resolved = records.len();
            for record in records {
                if let Some(entry) = anchors.get_mut(&record.link) {
                    entry.state = record.into();
                }
            }
            resolved
        };

        info!(
            vendor = %self.inner.name,
            new_links = new_links.len(),
            resolved,
            "Scan registered new links"
        );

        match (async_records, runtime) {
            (Some(future), Some(runtime)) => {
                let rewriter = self.clone();
                let task =
                    runtime.spawn(async move { rewriter.merge_async(future, requested, scan).await });
                Ok(ScanHandle::spawned(task))
            }
            _ => {
                self.emit(RewriterEvent::PageScanned);
                Ok(ScanHandle::ready())
            }
        }
    }

    /// What this vendor would rewrite `link` to right now.
    pub fn get_replacement_url(&self, link: LinkId) -> ReplacementLookup {
        let anchors = self.inner.anchors.lock();
        ReplacementLookup::from(anchors.get(&link).map(|entry| &entry.state))
    }

    /// True if `link` is tracked by this vendor, pending or resolved.
    pub fn is_watching_link(&self, link: LinkId) -> bool {
        self.inner.anchors.lock().contains_key(&link)
    }

    /// Rewrites `link` to this vendor's replacement URL for the duration of the
    /// current activation.
    ///
    /// Returns false (and leaves the link alone) when the vendor has no
    /// replacement, the link already points at it, or no Tokio runtime is
    /// available to schedule the restore. Otherwise the `href` is replaced now
    /// and put back after the restore delay.
    ///
    /// Overlapping activations on one link are last-write-wins for the
    /// replacement, but only the latest restore fires, and it puts back the
    /// href the link had before the first of them.
    pub fn rewrite_anchor_url(&self, link: LinkId) -> bool {
        let ReplacementLookup::Replace(replacement) = self.get_replacement_url(link) else {
            return false;
        };

        let Some(original) = self.inner.page.href(link) else {
            debug!(vendor = %self.inner.name, %link, "Link has no href, not rewriting");
            return false;
        };

        if original == replacement {
            return false;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                vendor = %self.inner.name,
                %link,
                "No Tokio runtime to schedule the restore, not rewriting"
            );
            return false;
        };

        let token = self.inner.restores.begin(link, original);
        self.inner.page.set_href(link, &replacement);
        debug!(vendor = %self.inner.name, %link, "Link rewritten");

        let page = Arc::clone(&self.inner.page);
        let restores = self.inner.restores.clone();
        let delay = self.inner.restore_delay;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // A later activation owns the restore now.
            let Some(original) = restores.finish(link, token) else {
                return;
            };
            page.set_href(link, &original);
            debug!(%link, "Link restored");
        });

        true
    }

    /// Snapshot of every resolved link that this vendor rewrites.
    pub fn replacement_map(&self) -> HashMap<LinkId, String> {
        self.inner
            .anchors
            .lock()
            .iter()
            .filter_map(|(link, entry)| {
                entry
                    .state
                    .replacement_url()
                    .map(|url| (*link, url.to_string()))
            })
            .collect()
    }

    /// Number of tracked links.
    pub fn watched_count(&self) -> usize {
        self.inner.anchors.lock().len()
    }

    /// Receives [`RewriterEvent`]s emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RewriterEvent> {
        self.inner.events.subscribe()
    }

    /// Tells the vendor an activation of one of its links was arbitrated.
    pub(crate) fn notify_click(&self, link: LinkId, replaced_by: Option<&str>) {
        self.emit(RewriterEvent::click(link, replaced_by));
    }

    fn emit(&self, event: RewriterEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn prune(&self, present: &HashSet<LinkId>) {
        let mut anchors = self.inner.anchors.lock();
        let before = anchors.len();
        anchors.retain(|id, _| present.contains(id));

        let removed = before - anchors.len();
        if removed > 0 {
            debug!(vendor = %self.inner.name, removed, "Forgot detached links");
        }
    }

    async fn merge_async(
        &self,
        future: AsyncRecords,
        requested: HashSet<LinkId>,
        scan: u64,
    ) -> Result<(), ArbiterError> {
        let outcome = future
            .await
            .and_then(|records| validate_records(&records, &requested).map(|()| records));

        let result = match outcome {
            Ok(records) => {
                let mut anchors = self.inner.anchors.lock();
                let mut merged = 0;
                let mut stale = 0;
                for record in records {
                    // Only entries this scan created; a link detached in flight
                    // is either gone or tracked again by a later scan.
                    match anchors.get_mut(&record.link) {
                        Some(entry) if entry.scan == scan => {
                            entry.state = record.into();
                            merged += 1;
                        }
                        _ => stale += 1,
                    }
                }
                drop(anchors);

                info!(vendor = %self.inner.name, merged, stale, "Asynchronous records merged");
                Ok(())
            }
            Err(e) if e.is_integration_error() => {
                error!(vendor = %self.inner.name, error = %e, "Asynchronous records rejected");
                Err(e)
            }
            Err(e) => {
                warn!(vendor = %self.inner.name, error = %e, "Asynchronous resolution failed");
                Err(e)
            }
        };

        self.emit(RewriterEvent::PageScanned);
        result
    }
}

/// Checks a batch before any of it is merged.
fn validate_records(
    records: &[RewriteRecord],
    requested: &HashSet<LinkId>,
) -> Result<(), ArbiterError> {
    for record in records {
        if !requested.contains(&record.link) {
            return Err(ArbiterError::malformed_record(format!(
                "record for {} which was not requested",
                record.link
            )));
        }

        if let Some(url) = &record.replacement_url
            && !is_absolute_url(url)
        {
            return Err(ArbiterError::malformed_record(format!(
                "replacement URL '{url}' for {} is not absolute",
                record.link
            )));
        }
    }

    Ok(())
}
