//! Coordination core: concurrent composition and the helpers built on it.
//!
//! - [`group`]: named members under one cancellation scope, bounded shutdown;
//! - [`detach`]: run a runner on its own task, outcome over a channel;
//! - [`start`]: launch a runner and wait for its readiness probe;
//! - [`recover`]: panic-to-error conversion shared by every task boundary;
//! - [`config`]: shutdown timeout and bus sizing.

pub(crate) mod config;
pub(crate) mod detach;
pub(crate) mod group;
pub(crate) mod recover;
pub(crate) mod start;

pub use config::{Config, SHUTDOWN_TIMEOUT};
pub use detach::detach;
pub use group::Group;
pub use start::{Start, Started, start};
