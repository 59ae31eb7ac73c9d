//! Domain layer: entities, events and the ports the core depends on.
//!
//! # Architecture
//!
//! - [`entities`] - Link handles, statuses, rewrite records, two-step responses
//! - [`activation`] - Link activation events delivered by the host
//! - [`events`] - Notifications published by rewriters
//! - [`ports`] - Traits for the page, the classification backend and resolvers
//!
//! # Design Principles
//!
//! - The domain layer has no dependency on infrastructure
//! - Ports are implemented by [`crate::infrastructure`] or by the host
//! - Behaviour lives in [`crate::application::services`]
//!
//! # Control Flow
//!
//! 1. Content changes: coordinator -> every rewriter's scan -> resolver -> map merge
//! 2. Link activation: coordinator -> ordered candidates -> first successful rewrite
//! 3. Every candidate receives a [`events::RewriterEvent::Click`] naming the winner

pub mod activation;
pub mod entities;
pub mod events;
pub mod ports;
