//! Error type shared by every runner.
//!
//! [`RunError`] is the single outcome type of [`Runner::run`](crate::Runner::run).
//! Composites never swallow errors: they wrap them with enough context (member name,
//! position in a sequence) to tell which participant failed, while keeping the
//! original error reachable through [`RunError::chain`] and [`RunError::find`].
//!
//! The enum is `Clone` so that [`Once`](crate::Once) can replay the exact same outcome
//! to every caller. Foreign errors are stored behind an `Arc` in [`RunError::Failed`].

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// # Outcome of a failed runner.
///
/// Sentinel variants (`Exited`, `Timeout`, `Canceled`, `DeadlineExceeded`,
/// `NotReady`, `Shutdown`) are produced by the crate itself; `Failed` carries
/// anything a runner reports.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RunError {
    /// A group member returned `Ok(())` while its siblings were still running.
    #[error("runner exited early")]
    Exited,

    /// Members did not exit within the shutdown timeout after the group was cancelled.
    #[error(
        "[{}]: one or more runners did not exit in time: shutdown cause: {cause}",
        .stuck.join(" ")
    )]
    Timeout {
        /// Sorted names of the members that had not reported back.
        stuck: Vec<String>,
        /// The configured shutdown timeout.
        timeout: Duration,
        /// Why the group was shutting down.
        #[source]
        cause: Box<RunError>,
    },

    /// The context was cancelled.
    #[error("context cancelled")]
    Canceled,

    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// A member of a [`Sequence`](crate::Sequence) failed.
    #[error("sequence [{index}/{len}]: {source}")]
    Sequence {
        /// Zero-based position of the failing member.
        index: usize,
        /// Number of members in the sequence.
        len: usize,
        #[source]
        source: Box<RunError>,
    },

    /// A named member of a [`Group`](crate::Group) failed.
    #[error("group[{name}]: {source}")]
    Member {
        name: Arc<str>,
        #[source]
        source: Box<RunError>,
    },

    /// A runner panicked with a [`RunError`] payload.
    #[error("recovered panic: {source}")]
    Recovered {
        #[source]
        source: Box<RunError>,
    },

    /// A runner panicked with any other payload.
    #[error("recovered panic: {message}")]
    Panic { message: String },

    /// [`start`](crate::start) gave up before the readiness probe succeeded.
    #[error("runner not ready: {source}")]
    NotReady {
        #[source]
        source: Box<RunError>,
    },

    /// A started runner reported an error while being shut down.
    #[error("runner shutdown with error: {source}")]
    Shutdown {
        #[source]
        source: Box<RunError>,
    },

    /// A member failed after the parent context had already ended.
    ///
    /// `reason` is why the parent ended; the member error stays reachable as the source.
    #[error("{reason}: {source}")]
    Interrupted {
        reason: Box<RunError>,
        #[source]
        source: Box<RunError>,
    },

    /// Error reported by a runner.
    #[error(transparent)]
    Failed(Arc<dyn StdError + Send + Sync + 'static>),
}

impl RunError {
    /// Wraps any error (or message) reported by a runner.
    ///
    /// # Example
    /// ```
    /// use runvisor::RunError;
    ///
    /// let err = RunError::other("connection refused");
    /// assert_eq!(err.to_string(), "connection refused");
    /// assert_eq!(err.as_label(), "failed");
    /// ```
    pub fn other(err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        RunError::Failed(Arc::from(err.into()))
    }

    pub(crate) fn member(name: Arc<str>, source: RunError) -> Self {
        RunError::Member {
            name,
            source: Box::new(source),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::Exited => "runner_exited",
            RunError::Timeout { .. } => "group_timeout",
            RunError::Canceled => "context_canceled",
            RunError::DeadlineExceeded => "context_deadline_exceeded",
            RunError::Sequence { .. } => "sequence_failed",
            RunError::Member { .. } => "member_failed",
            RunError::Recovered { .. } => "panic_recovered",
            RunError::Panic { .. } => "panic",
            RunError::NotReady { .. } => "not_ready",
            RunError::Shutdown { .. } => "shutdown_failed",
            RunError::Interrupted { .. } => "interrupted",
            RunError::Failed(_) => "failed",
        }
    }

    /// The wrapped [`RunError`], if this variant wraps one.
    pub fn wrapped(&self) -> Option<&RunError> {
        match self {
            RunError::Timeout { cause, .. } => Some(cause),
            RunError::Sequence { source, .. }
            | RunError::Member { source, .. }
            | RunError::Recovered { source }
            | RunError::NotReady { source }
            | RunError::Shutdown { source }
            | RunError::Interrupted { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Iterates over this error and every [`RunError`] it wraps, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &RunError> {
        std::iter::successors(Some(self), |e| e.wrapped())
    }

    /// The innermost [`RunError`] of the chain.
    pub fn root(&self) -> &RunError {
        self.chain().last().unwrap_or(self)
    }

    /// Finds the first error of type `E` in the chain.
    ///
    /// Looks through [`RunError::Failed`] payloads and their own `source()` chains,
    /// so an error returned by a runner deep inside a composite can still be
    /// recovered by type.
    ///
    /// # Example
    /// ```
    /// use runvisor::RunError;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "busy");
    /// let err = RunError::Shutdown { source: Box::new(RunError::other(io)) };
    /// assert_eq!(
    ///     err.find::<std::io::Error>().map(|e| e.kind()),
    ///     Some(std::io::ErrorKind::AddrInUse)
    /// );
    /// ```
    pub fn find<E: StdError + 'static>(&self) -> Option<&E> {
        for link in self.chain() {
            let dyn_link: &(dyn StdError + 'static) = link;
            if let Some(found) = dyn_link.downcast_ref::<E>() {
                return Some(found);
            }
            if let RunError::Failed(inner) = link {
                let mut next: Option<&(dyn StdError + 'static)> = Some(inner.as_ref());
                while let Some(err) = next {
                    if let Some(found) = err.downcast_ref::<E>() {
                        return Some(found);
                    }
                    next = err.source();
                }
            }
        }
        None
    }

    /// True if a member exited early somewhere in the chain.
    pub fn is_exited(&self) -> bool {
        self.chain().any(|e| matches!(e, RunError::Exited))
    }

    /// True if a group shutdown timed out somewhere in the chain.
    pub fn is_timeout(&self) -> bool {
        self.chain().any(|e| matches!(e, RunError::Timeout { .. }))
    }

    /// True if the chain contains a context cancellation.
    pub fn is_canceled(&self) -> bool {
        self.ended_by(|e| matches!(e, RunError::Canceled))
    }

    /// True if the chain contains an exceeded context deadline.
    pub fn is_deadline_exceeded(&self) -> bool {
        self.ended_by(|e| matches!(e, RunError::DeadlineExceeded))
    }

    /// Matches `is` against every link and every interruption reason.
    fn ended_by(&self, is: impl Fn(&RunError) -> bool) -> bool {
        self.chain().any(|e| match e {
            RunError::Interrupted { reason, .. } => is(e) || is(&**reason),
            _ => is(e),
        })
    }

    /// True if the error comes from a runner that never became ready.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, RunError::NotReady { .. })
    }

    /// Names of the members that did not exit in time, from the outermost timeout.
    pub fn stuck(&self) -> Option<&[String]> {
        self.chain().find_map(|e| match e {
            RunError::Timeout { stuck, .. } => Some(stuck.as_slice()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("inner")]
    struct Inner;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] Inner);

    #[test]
    fn test_find_through_wrappers() {
        let err = RunError::Sequence {
            index: 1,
            len: 3,
            source: Box::new(RunError::member("foo".into(), RunError::other(Inner))),
        };
        assert!(err.find::<Inner>().is_some());
        assert_eq!(err.to_string(), "sequence [1/3]: group[foo]: inner");
    }

    #[test]
    fn test_find_in_foreign_source_chain() {
        let err = RunError::member("foo".into(), RunError::other(Outer(Inner)));
        assert!(err.find::<Outer>().is_some());
        assert!(err.find::<Inner>().is_some());
        assert!(err.find::<std::io::Error>().is_none());
    }

    #[test]
    fn test_timeout_message_names_stuck() {
        let err = RunError::Timeout {
            stuck: vec!["bar".into(), "baz".into()],
            timeout: Duration::from_secs(10),
            cause: Box::new(RunError::member("foo".into(), RunError::other(Inner))),
        };
        assert!(
            err.to_string()
                .starts_with("[bar baz]: one or more runners did not exit in time")
        );
        assert!(err.is_timeout());
        assert!(err.find::<Inner>().is_some());
        assert_eq!(err.stuck(), Some(&["bar".to_string(), "baz".to_string()][..]));
    }

    #[test]
    fn test_root_and_predicates() {
        let err = RunError::NotReady {
            source: Box::new(RunError::member("ready".into(), RunError::DeadlineExceeded)),
        };
        assert!(err.is_not_ready());
        assert!(err.is_deadline_exceeded());
        assert!(!err.is_canceled());
        assert!(matches!(err.root(), RunError::DeadlineExceeded));
        assert_eq!(err.chain().count(), 3);
    }

    #[test]
    fn test_chain_walks_wrapped_errors() {
        let err = RunError::Shutdown {
            source: Box::new(RunError::member("foo".into(), RunError::other(Inner))),
        };
        assert!(matches!(err.wrapped(), Some(RunError::Member { .. })));
        let labels: Vec<_> = err.chain().map(RunError::as_label).collect();
        assert_eq!(labels, ["shutdown_failed", "member_failed", "failed"]);
        assert!(RunError::Exited.wrapped().is_none());
    }

    #[test]
    fn test_interrupted_keeps_both_errors() {
        let err = RunError::Interrupted {
            reason: Box::new(RunError::DeadlineExceeded),
            source: Box::new(RunError::member("bar".into(), RunError::other(Inner))),
        };
        assert_eq!(err.to_string(), "context deadline exceeded: group[bar]: inner");
        assert!(err.is_deadline_exceeded());
        assert!(!err.is_canceled());
        assert!(err.find::<Inner>().is_some());
    }

    #[test]
    fn test_clone_keeps_identity() {
        let err = RunError::member("foo".into(), RunError::other(Inner));
        let copy = err.clone();
        let (RunError::Member { source: a, .. }, RunError::Member { source: b, .. }) = (&err, &copy)
        else {
            panic!("expected member errors");
        };
        let (RunError::Failed(a), RunError::Failed(b)) = (a.as_ref(), b.as_ref()) else {
            panic!("expected failed payloads");
        };
        assert!(Arc::ptr_eq(a, b));
    }
}
