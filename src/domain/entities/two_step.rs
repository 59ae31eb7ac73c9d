//! The two-phase classification result returned by resolvers.
//!
//! Some decisions are known immediately (cached domains, excluded domains,
//! optimistic placeholders) while others need a backend round trip. A
//! [`TwoStepResponse`] carries both: the synchronous batch is merged as soon as
//! the resolver returns, the asynchronous batch when its future settles.
//!
//! | Resolver situation                            | Response                  |
//! |-----------------------------------------------|---------------------------|
//! | no network needed                             | `from_sync(records)`      |
//! | network needed, no local knowledge            | `from_async(future)`      |
//! | local cache plus network for the rest         | `new(Some(..), Some(..))` |

use super::rewrite::RewriteRecord;
use crate::error::ArbiterError;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;

/// Future resolving to the asynchronous batch of a [`TwoStepResponse`].
pub type AsyncRecords = BoxFuture<'static, Result<Vec<RewriteRecord>, ArbiterError>>;

/// Synchronous and asynchronous halves of a resolver answer.
///
/// At least one half must be present for a non-empty request; a response with
/// neither is rejected by the rewriter as a configuration error.
#[derive(Default)]
pub struct TwoStepResponse {
    pub sync_response: Option<Vec<RewriteRecord>>,
    pub async_response: Option<AsyncRecords>,
}

impl TwoStepResponse {
    pub fn new(sync_response: Option<Vec<RewriteRecord>>, async_response: Option<AsyncRecords>) -> Self {
        Self {
            sync_response,
            async_response,
        }
    }

    pub fn from_sync(records: Vec<RewriteRecord>) -> Self {
        Self::new(Some(records), None)
    }

    pub fn from_async<F>(future: F) -> Self
    where
        F: Future<Output = Result<Vec<RewriteRecord>, ArbiterError>> + Send + 'static,
    {
        Self::new(None, Some(future.boxed()))
    }

    /// Attaches an asynchronous batch to an existing response.
    pub fn with_async<F>(mut self, future: F) -> Self
    where
        F: Future<Output = Result<Vec<RewriteRecord>, ArbiterError>> + Send + 'static,
    {
        self.async_response = Some(future.boxed());
        self
    }

    /// True when at least one half is present.
    pub fn is_well_formed(&self) -> bool {
        self.sync_response.is_some() || self.async_response.is_some()
    }

    pub fn has_async(&self) -> bool {
        self.async_response.is_some()
    }

    pub fn into_parts(self) -> (Option<Vec<RewriteRecord>>, Option<AsyncRecords>) {
        (self.sync_response, self.async_response)
    }
}

impl fmt::Debug for TwoStepResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoStepResponse")
            .field("sync_response", &self.sync_response)
            .field(
                "async_response",
                &self.async_response.as_ref().map(|_| "<future>"),
            )
            .finish()
    }
}
