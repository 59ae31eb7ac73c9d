//! Core entities of the rewriting protocol.
//!
//! Entities are plain data: handles, statuses and the records exchanged between
//! resolvers and rewriters. Behaviour lives in [`crate::application::services`].
//!
//! # Entity Types
//!
//! - [`LinkId`] / [`Anchor`] - Link handles and scan-time link snapshots
//! - [`DomainStatus`] - Affiliate classification of a destination domain
//! - [`RewriteRecord`] - One vendor's decision for one link
//! - [`AnchorState`] - Tagged per-link state kept by a rewriter
//! - [`LinkClassification`] - Where a link's domain stands in a resolution cache
//! - [`TwoStepResponse`] - Synchronous plus asynchronous resolver answer

pub mod domain_status;
pub mod link;
pub mod rewrite;
pub mod two_step;

pub use domain_status::DomainStatus;
pub use link::{Anchor, LinkId};
pub use rewrite::{AnchorState, LinkClassification, ReplacementLookup, RewriteRecord};
pub use two_step::{AsyncRecords, TwoStepResponse};
