//! # Ready-gated startup.
//!
//! [`start`] launches a runner next to its readiness probe and returns only once the
//! probe has succeeded, or once it is clear it never will.
//!
//! ```text
//! start(ctx, runner, probe)
//!   └─► detach(Group {
//!         "runner": runner,
//!         "ready":  Sequence[probe, publish, Idle],
//!       })
//!         ├─ publish fires      → Ok(Started)
//!         └─ group exits first  → cancel, wait, Err(NotReady)
//! ```
//!
//! After readiness the `ready` member idles until shutdown, so an exit of the runner
//! still counts as an early exit and brings the group down.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    context::Context,
    core::{config::Config, detach::detach, group::Group},
    error::RunError,
    events::{Bus, Event, EventKind},
    runners::{Idle, RunFn, Runner, RunnerRef, Sequence},
};

type Outcome = Result<(), RunError>;

/// Handle to a runner that reached readiness.
///
/// Dropping the handle cancels the runner without waiting for it; call
/// [`Started::shutdown`] to observe the final outcome.
#[derive(Debug)]
pub struct Started {
    ctx: Context,
    done: mpsc::Receiver<Outcome>,
}

impl Started {
    /// Context the runner and its probe run under.
    ///
    /// It is cancelled when the runner fails after readiness, so callers can watch it.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Cancels the runner and waits for it to stop.
    ///
    /// A failure is reported as [`RunError::Shutdown`].
    pub async fn shutdown(mut self) -> Result<(), RunError> {
        self.ctx.cancel();
        match self.done.recv().await {
            Some(Err(err)) => Err(RunError::Shutdown {
                source: Box::new(err),
            }),
            Some(Ok(())) | None => Ok(()),
        }
    }
}

impl Drop for Started {
    fn drop(&mut self) {
        self.ctx.cancel();
    }
}

/// Builder for a ready-gated launch.
///
/// # Example
/// ```
/// use runvisor::{Context, Idle, RunFn, Start};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let started = Start::new(Idle, RunFn::new(|_ctx: Context| async { Ok(()) }))
///     .launch(&Context::new())
///     .await
///     .unwrap();
/// started.shutdown().await.unwrap();
/// # }
/// ```
pub struct Start {
    runner: RunnerRef,
    probe: RunnerRef,
    cfg: Config,
    bus: Option<Bus>,
}

impl std::fmt::Debug for Start {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Start")
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

impl Start {
    /// Pairs `runner` with the `probe` that tells when it is ready.
    pub fn new(runner: impl Runner, probe: impl Runner) -> Self {
        Self {
            runner: Arc::new(runner),
            probe: Arc::new(probe),
            cfg: Config::default(),
            bus: None,
        }
    }

    /// Configuration of the underlying group (shutdown timeout).
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Publishes readiness and group lifecycle events to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Launches the runner and waits for readiness.
    pub async fn launch(self, parent: &Context) -> Result<Started, RunError> {
        let ctx = parent.child();
        let (ready_tx, mut ready_rx) = mpsc::channel::<Outcome>(1);

        let publish = RunFn::new(move |ctx: Context| {
            let ready_tx = ready_tx.clone();
            async move {
                let signal = match ctx.err() {
                    Some(err) => Err(err),
                    None => Ok(()),
                };
                let _ = ready_tx.try_send(signal.clone());
                signal
            }
        });

        let steps: Vec<RunnerRef> = vec![self.probe, Arc::new(publish), Arc::new(Idle)];
        let mut group = Group::new()
            .with_member("runner", self.runner)
            .with_member("ready", Sequence::new(steps))
            .with_config(self.cfg);
        if let Some(bus) = &self.bus {
            group = group.with_bus(bus.clone());
        }

        // The handle's context ends with the group, whatever ended it.
        let supervised = RunFn::new(move |ctx: Context| {
            let group = group.clone();
            async move {
                let outcome = group.run(ctx.clone()).await;
                ctx.cancel();
                outcome
            }
        });
        let (done_tx, mut done_rx) = mpsc::channel::<Outcome>(1);
        detach(ctx.clone(), supervised, done_tx);

        let reason = tokio::select! {
            biased;
            signal = ready_rx.recv() => match signal {
                Some(Ok(())) => {
                    if let Some(bus) = &self.bus {
                        bus.publish(Event::new(EventKind::RunnerReady));
                    }
                    return Ok(Started { ctx, done: done_rx });
                }
                Some(Err(err)) => err,
                None => exit_reason(done_rx.recv().await, &ctx),
            },
            outcome = done_rx.recv() => exit_reason(outcome, &ctx),
        };

        ctx.cancel();
        // Bounded by the group's shutdown timeout; `None` once it already reported.
        let _ = done_rx.recv().await;

        if let Some(bus) = &self.bus {
            bus.publish(Event::new(EventKind::RunnerNotReady).with_reason(reason.to_string()));
        }
        Err(RunError::NotReady {
            source: Box::new(reason),
        })
    }
}

fn exit_reason(outcome: Option<Outcome>, ctx: &Context) -> RunError {
    match outcome {
        Some(Err(err)) => err,
        Some(Ok(())) | None => ctx.err().unwrap_or(RunError::Exited),
    }
}

/// Launches `runner` and returns once `probe` succeeds.
///
/// Shorthand for [`Start::new`]`(runner, probe).launch(ctx)` with default settings.
pub async fn start(
    ctx: &Context,
    runner: impl Runner,
    probe: impl Runner,
) -> Result<Started, RunError> {
    Start::new(runner, probe).launch(ctx).await
}
