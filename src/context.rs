//! # Cancellation context handed to every runner.
//!
//! [`Context`] is a [`CancellationToken`] that also remembers *why* it was cancelled
//! (explicit cancel or deadline) and, optionally, a deadline.
//!
//! ```text
//! Context::new()                       root, live until cancel()
//!   └─► child()                        cancelled with its parent, or on its own
//!   └─► with_timeout(1s)               cancelled by a timer task → DeadlineExceeded
//! ```
//!
//! ## Rules
//! - A child observes its parent's cancellation; cancelling a child never affects the parent.
//! - [`Context::err`] is `None` while live; afterwards it reports the reason of the
//!   context that was actually cancelled (the child's own, else the nearest ancestor's).
//! - The reason is recorded **before** the token is cancelled, so a woken waiter always
//!   sees it.
//! - Deadline timers run on a spawned Tokio task: [`Context::with_timeout`] and
//!   [`Context::with_deadline`] must be called inside a Tokio runtime.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::RunError;

#[derive(Debug)]
struct Node {
    reason: OnceLock<RunError>,
    parent: Option<Arc<Node>>,
}

/// Cancellation and deadline scope for a runner invocation.
///
/// Cheap to clone; clones share the same cancellation state.
#[derive(Clone, Debug)]
pub struct Context {
    token: CancellationToken,
    node: Arc<Node>,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl From<CancellationToken> for Context {
    /// Adopts an existing token as a root context.
    fn from(token: CancellationToken) -> Self {
        Self {
            token,
            node: Arc::new(Node {
                reason: OnceLock::new(),
                parent: None,
            }),
            deadline: None,
        }
    }
}

impl Context {
    /// Creates a root context that is only cancelled by [`Context::cancel`].
    pub fn new() -> Self {
        Self::from(CancellationToken::new())
    }

    /// Derives a child context: cancelled when `self` is, or on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            node: Arc::new(Node {
                reason: OnceLock::new(),
                parent: Some(Arc::clone(&self.node)),
            }),
            deadline: self.deadline,
        }
    }

    /// Derives a child context that is cancelled with [`RunError::DeadlineExceeded`]
    /// after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a child context that is cancelled with [`RunError::DeadlineExceeded`]
    /// at `deadline`. An earlier inherited deadline is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.child();
        let effective = match self.deadline {
            Some(inherited) if inherited <= deadline => inherited,
            _ => deadline,
        };
        child.deadline = Some(effective);

        let timer = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(effective) => timer.cancel_with(RunError::DeadlineExceeded),
                _ = timer.token.cancelled() => {}
            }
        });
        child
    }

    /// Cancels this context and all of its children.
    pub fn cancel(&self) {
        self.cancel_with(RunError::Canceled);
    }

    fn cancel_with(&self, reason: RunError) {
        // Already done through an ancestor: keep reporting the ancestor's reason.
        if self.token.is_cancelled() {
            return;
        }
        let _ = self.node.reason.set(reason);
        self.token.cancel();
    }

    /// True once this context (or an ancestor) has been cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when this context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Why the context is done, or `None` while it is live.
    ///
    /// # Example
    /// ```
    /// use runvisor::{Context, RunError};
    ///
    /// let parent = Context::new();
    /// let child = parent.child();
    /// assert!(child.err().is_none());
    ///
    /// parent.cancel();
    /// assert!(matches!(child.err(), Some(RunError::Canceled)));
    /// ```
    pub fn err(&self) -> Option<RunError> {
        if !self.token.is_cancelled() {
            return None;
        }
        let mut node = Some(&self.node);
        while let Some(n) = node {
            if let Some(reason) = n.reason.get() {
                return Some(reason.clone());
            }
            node = n.parent.as_ref();
        }
        // Cancelled through a foreign token adopted with `From<CancellationToken>`.
        Some(RunError::Canceled)
    }

    /// The deadline of this context, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The underlying token, for APIs that speak `tokio_util` directly.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns a guard that cancels this context when dropped.
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Derives a child context cancelled by the first OS termination signal.
    ///
    /// Meant for the outermost layer of an application (`main`); the coordination
    /// core never installs signal handlers itself.
    pub fn on_shutdown_signal(&self) -> Self {
        let child = self.child();
        let watcher = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                res = crate::shutdown::wait_for_shutdown_signal() => {
                    if res.is_ok() {
                        watcher.cancel();
                    }
                }
                _ = watcher.cancelled() => {}
            }
        });
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_child_follows_parent() {
        let parent = Context::new();
        let child = parent.child();
        let grandchild = child.child();

        parent.cancel();
        assert!(grandchild.is_cancelled());
        assert!(matches!(grandchild.err(), Some(RunError::Canceled)));
    }

    #[tokio::test]
    async fn test_child_does_not_cancel_parent() {
        let parent = Context::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
        assert!(parent.err().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_reason() {
        let parent = Context::new();
        let ctx = parent.with_timeout(Duration::from_secs(1));
        let child = ctx.child();

        child.cancelled().await;
        assert!(matches!(ctx.err(), Some(RunError::DeadlineExceeded)));
        assert!(matches!(child.err(), Some(RunError::DeadlineExceeded)));
        assert!(parent.err().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_reason_wins_over_parent() {
        let parent = Context::new().with_timeout(Duration::from_secs(1));
        let child = parent.child();
        child.cancel();

        time::sleep(Duration::from_secs(2)).await;
        assert!(matches!(child.err(), Some(RunError::Canceled)));
        assert!(matches!(parent.err(), Some(RunError::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inherited_deadline_is_kept() {
        let outer = Context::new().with_timeout(Duration::from_secs(1));
        let inner = outer.with_timeout(Duration::from_secs(5));
        assert_eq!(inner.deadline(), outer.deadline());
    }

    #[tokio::test]
    async fn test_foreign_token() {
        let token = CancellationToken::new();
        let ctx = Context::from(token.clone());
        token.cancel();
        assert!(matches!(ctx.err(), Some(RunError::Canceled)));
    }
}
