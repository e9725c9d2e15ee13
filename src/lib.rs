//! # runvisor
//!
//! **Runvisor** composes async units of work ("runners") into larger programs with
//! well-defined shutdown semantics:
//!
//! - a failure anywhere cancels everything it runs alongside,
//! - shutdown is bounded, so a misbehaving member cannot hang the process,
//! - panics are contained and surfaced as errors,
//! - "start and wait until ready" sequences need no ad-hoc signalling.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                      Context (cancellation + reason + deadline)
//!                                   │
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Group (concurrent composite)                                     │
//! │  - child Context shared by every member                           │
//! │  - one Tokio task per member, panics caught                       │
//! │  - first qualifying exit = cause → cancel the rest                │
//! │  - shutdown timer (Config::shutdown_timeout) → RunError::Timeout  │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │   Runner     │   │  Sequence    │   │    Group     │   │
//!     │ (RunFn, ...) │   │ (ordered)    │   │  (nested)    │   │
//!     └──────────────┘   └──────────────┘   └──────────────┘   │
//!                                                              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │              Bus (optional broadcast of lifecycle events)         │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                            SubscriberSet ──► LogWriter / custom Subscribe
//! ```
//!
//! ### Group lifecycle
//! ```text
//! Running ──(first Err, or Ok while the parent is live)──► ShuttingDown(cause)
//!    │                                                        ├─ all exited  ─► Err(cause)
//!    │                                                        └─ timer fired ─► Err(Timeout { stuck, cause })
//!    └──(parent cancelled, members return Ok)──► Ok(())
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / functions                      |
//! |-------------------|-------------------------------------------------------------|--------------------------------------------|
//! | **Runners**       | The unit of work and its simple composites.                 | [`Runner`], [`RunFn`], [`Sequence`], [`Once`], [`Idle`] |
//! | **Groups**        | Concurrent composition with bounded shutdown.               | [`Group`], [`Config`]                      |
//! | **Startup**       | Ready-gated launch and detached execution.                  | [`start`], [`Start`], [`Started`], [`detach`] |
//! | **Cancellation**  | Cancellation scope that remembers why it ended.             | [`Context`]                                |
//! | **Errors**        | One cloneable error type with inspection helpers.           | [`RunError`]                               |
//! | **Events**        | Lifecycle events and subscriber fan-out.                    | [`Bus`], [`Event`], [`Subscribe`], [`SubscriberSet`] |
//! | **Probes**        | TCP/HTTP readiness polling with backoff.                    | [`Poller`], [`BackoffPolicy`]              |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//! - `process`: exports the unix-only `Process` runner for external programs.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use runvisor::{Context, Group, RunError, RunFn, Runner, Sequence};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let migrate = RunFn::arc(|_ctx: Context| async { Ok::<_, RunError>(()) });
//!     let serve = RunFn::arc(|ctx: Context| async move {
//!         ctx.cancelled().await;
//!         Ok(())
//!     });
//!     let app = Sequence::default().then(migrate).then(serve);
//!
//!     let group = Group::new()
//!         .with_member("app", app)
//!         .with_shutdown_timeout(Duration::from_secs(5));
//!
//!     let ctx = Context::new();
//!     ctx.cancel();
//!     assert!(group.run(ctx).await.is_ok());
//! }
//! ```
mod context;
mod core;
mod error;
mod events;
mod policies;
mod probes;
mod runners;
mod shutdown;
mod subscribers;

// ---- Public re-exports ----

pub use context::Context;
pub use crate::core::{Config, Group, SHUTDOWN_TIMEOUT, Start, Started, detach, start};
pub use error::RunError;
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use probes::{PokeError, PollMode, Poller, PollerError};
pub use runners::{Idle, Once, RunFn, Runner, RunnerRef, Sequence};
pub use shutdown::wait_for_shutdown_signal;
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: external programs as runners.
// Enable with: `--features process`
#[cfg(all(unix, feature = "process"))]
mod process;
#[cfg(all(unix, feature = "process"))]
pub use process::{Output, Process, ProcessError};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
