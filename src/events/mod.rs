//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by groups, the `start` helper and
//! subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Group` (when built `with_bus`), `Start` (when built `with_bus`),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `SubscriberSet::listen` (fans out to `Subscribe` workers),
//!   or any receiver from `Bus::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
