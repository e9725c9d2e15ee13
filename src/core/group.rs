//! # Group: concurrent composition with a shared fate.
//!
//! Every member runs on its own Tokio task against a child of the caller's context.
//! The first qualifying exit (the *cause*) cancels the rest; the group then waits for
//! the remaining members, bounded by [`Config::shutdown_timeout`].
//!
//! ```text
//! run(parent)
//!   ├─► child = parent.child()          (cancelled on every return path)
//!   ├─► spawn member tasks ──► (name, outcome) ──► mpsc(n + 1)
//!   └─► orchestrator loop:
//!         ├─ outcome       → mark exited; first Err / early Ok → cause
//!         │                  → child.cancel() + arm shutdown timer (once)
//!         ├─ parent done   → arm shutdown timer
//!         └─ timer fired   → RunError::Timeout { stuck, timeout, cause }
//! ```
//!
//! ## Rules
//! - The cause is recorded once and never overwritten.
//! - An `Ok(())` exit counts as a cause ([`RunError::Exited`]) only while the parent
//!   is live and the group was not built with [`Group::without_cancel`].
//! - An `Err` observed after the parent ended is wrapped in [`RunError::Interrupted`]
//!   with the parent's reason, unless it already reports a cancellation or deadline.
//! - Stuck members are reported, never aborted: their tasks leak until they return,
//!   and their late sends fail without blocking.
//! - Panics inside members are converted to errors and treated as failures.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::{
    context::Context,
    core::{config::Config, recover::from_panic},
    error::RunError,
    events::{Bus, Event, EventKind},
    runners::{Runner, RunnerRef},
};

/// Outcome of one member, tagged with its name.
struct MemberExit {
    name: Arc<str>,
    result: Result<(), RunError>,
}

/// Named runners executed concurrently.
///
/// Names are diagnostics only (error wrapping, stuck lists, events). Members are kept
/// sorted by name so stuck lists come out deterministic.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use runvisor::{Context, Group, Idle, RunError, RunFn, Runner};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let group = Group::new()
///         .with_member("idle", Idle)
///         .with_member("job", RunFn::new(|_ctx: Context| async {
///             Err(RunError::other("job failed"))
///         }))
///         .with_shutdown_timeout(Duration::from_secs(1));
///
///     let err = group.run(Context::new()).await.unwrap_err();
///     assert_eq!(err.to_string(), "group[job]: job failed");
/// }
/// ```
#[derive(Clone)]
pub struct Group {
    members: BTreeMap<Arc<str>, RunnerRef>,
    cancel_on_exit: bool,
    cfg: Config,
    bus: Option<Bus>,
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .field("cancel_on_exit", &self.cancel_on_exit)
            .field("cfg", &self.cfg)
            .finish()
    }
}

impl Group {
    /// Creates an empty group with cancel-on-exit enabled and default [`Config`].
    pub fn new() -> Self {
        Self {
            members: BTreeMap::new(),
            cancel_on_exit: true,
            cfg: Config::default(),
            bus: None,
        }
    }

    /// Adds (or replaces) the member called `name`.
    pub fn with_member(mut self, name: impl Into<Arc<str>>, runner: impl Runner) -> Self {
        self.insert(name, Arc::new(runner));
        self
    }

    /// Adds (or replaces) the member called `name`, returning the replaced runner.
    pub fn insert(&mut self, name: impl Into<Arc<str>>, runner: RunnerRef) -> Option<RunnerRef> {
        self.members.insert(name.into(), runner)
    }

    /// Disables the early-exit rule: a member returning `Ok(())` no longer stops its
    /// siblings. Errors still do.
    pub fn without_cancel(mut self) -> Self {
        self.cancel_on_exit = false;
        self
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets how long members may take to exit once the group is cancelled.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.shutdown_timeout = timeout;
        self
    }

    /// Publishes lifecycle events to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn publish(&self, make: impl FnOnce() -> Event) {
        if let Some(bus) = &self.bus {
            bus.publish(make());
        }
    }

    fn spawn_member(
        &self,
        name: &Arc<str>,
        runner: &RunnerRef,
        ctx: &Context,
        tx: &mpsc::Sender<MemberExit>,
    ) {
        self.publish(|| Event::new(EventKind::MemberStarting).with_member(Arc::clone(name)));

        let name = Arc::clone(name);
        let runner = Arc::clone(runner);
        let ctx = ctx.clone();
        let tx = tx.clone();
        let bus = self.bus.clone();

        tokio::spawn(async move {
            let result = match AssertUnwindSafe(runner.run(ctx)).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => {
                    let err = from_panic(payload);
                    if let Some(bus) = &bus {
                        bus.publish(
                            Event::new(EventKind::MemberPanicked)
                                .with_member(Arc::clone(&name))
                                .with_reason(err.to_string()),
                        );
                    }
                    Err(err)
                }
            };
            // Fails at once if the group stopped listening.
            let _ = tx.send(MemberExit { name, result }).await;
        });
    }

    fn publish_exit(&self, exit: &MemberExit) {
        self.publish(|| match &exit.result {
            Ok(()) => Event::new(EventKind::MemberStopped).with_member(Arc::clone(&exit.name)),
            Err(e) => Event::new(EventKind::MemberFailed)
                .with_member(Arc::clone(&exit.name))
                .with_reason(e.to_string()),
        });
    }
}

/// A failure seen after the parent ended also carries the parent's reason.
fn interrupted(parent_reason: Option<RunError>, failed: RunError) -> RunError {
    match parent_reason {
        Some(reason) if !failed.is_canceled() && !failed.is_deadline_exceeded() => {
            RunError::Interrupted {
                reason: Box::new(reason),
                source: Box::new(failed),
            }
        }
        _ => failed,
    }
}

impl<N: Into<Arc<str>>> FromIterator<(N, RunnerRef)> for Group {
    fn from_iter<I: IntoIterator<Item = (N, RunnerRef)>>(iter: I) -> Self {
        let mut group = Group::new();
        for (name, runner) in iter {
            group.insert(name, runner);
        }
        group
    }
}

#[async_trait]
impl Runner for Group {
    async fn run(&self, parent: Context) -> Result<(), RunError> {
        if self.members.is_empty() {
            return Ok(());
        }

        let ctx = parent.child();
        let _cancel_on_return = ctx.drop_guard();

        let (tx, mut rx) = mpsc::channel::<MemberExit>(self.members.len() + 1);
        for (name, runner) in &self.members {
            self.spawn_member(name, runner, &ctx, &tx);
        }
        drop(tx);

        let timeout = self.cfg.shutdown_timeout;
        let mut exited: BTreeMap<&str, bool> =
            self.members.keys().map(|n| (&**n, false)).collect();
        let mut remaining = self.members.len();
        let mut cause: Option<RunError> = None;

        let grace = time::sleep(timeout);
        tokio::pin!(grace);
        let mut armed = false;

        while remaining > 0 {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(exit) = msg else { break };
                    remaining -= 1;
                    if let Some(done) = exited.get_mut(&*exit.name) {
                        *done = true;
                    }
                    self.publish_exit(&exit);
                    if cause.is_some() {
                        continue;
                    }

                    let recorded = match exit.result {
                        Err(e) => Some(interrupted(
                            parent.err(),
                            RunError::member(Arc::clone(&exit.name), e),
                        )),
                        Ok(()) if self.cancel_on_exit && !parent.is_cancelled() => {
                            Some(RunError::member(Arc::clone(&exit.name), RunError::Exited))
                        }
                        Ok(()) => None,
                    };
                    if let Some(recorded) = recorded {
                        self.publish(|| {
                            Event::new(EventKind::ShutdownRequested)
                                .with_member(Arc::clone(&exit.name))
                                .with_reason(recorded.to_string())
                                .with_timeout(timeout)
                        });
                        cause = Some(recorded);
                        ctx.cancel();
                        if !armed {
                            grace.as_mut().reset(Instant::now() + timeout);
                            armed = true;
                        }
                    }
                }
                _ = &mut grace, if armed => {
                    let stuck: Vec<String> = exited
                        .iter()
                        .filter(|(_, done)| !**done)
                        .map(|(name, _)| (*name).to_string())
                        .collect();
                    self.publish(|| {
                        Event::new(EventKind::TimeoutExceeded)
                            .with_reason(stuck.join(" "))
                            .with_timeout(timeout)
                    });
                    let cause = cause
                        .or_else(|| parent.err())
                        .unwrap_or(RunError::Canceled);
                    return Err(RunError::Timeout {
                        stuck,
                        timeout,
                        cause: Box::new(cause),
                    });
                }
                _ = parent.cancelled(), if !armed => {
                    grace.as_mut().reset(Instant::now() + timeout);
                    armed = true;
                }
            }
        }

        if armed {
            self.publish(|| Event::new(EventKind::AllStoppedWithin).with_timeout(timeout));
        }
        match cause {
            Some(cause) => Err(cause),
            None => Ok(()),
        }
    }
}
