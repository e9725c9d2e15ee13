//! # Sequential composition.
//!
//! [`Sequence`] runs its members one at a time, in order, with the same context.
//!
//! ```text
//! Sequence[a, b, c].run(ctx)
//!   ├─► a.run(ctx) ── Ok ──►
//!   ├─► b.run(ctx) ── Err(e) ──► return Sequence{ index: 1, len: 3, e }
//!   └─► c never runs
//! ```
//!
//! ## Rules
//! - Stops at the **first** failing member; later members never run.
//! - Cancellation is not special-cased: it simply flows through the shared `ctx`.
//! - Stateless, so a sequence can be run again.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    context::Context,
    error::RunError,
    runners::{Runner, RunnerRef},
};

/// Ordered list of runners executed one after another.
#[derive(Clone, Default)]
pub struct Sequence {
    members: Vec<RunnerRef>,
}

impl Sequence {
    /// Creates a sequence from already shared runners.
    pub fn new(members: Vec<RunnerRef>) -> Self {
        Self { members }
    }

    /// Appends a runner.
    pub fn then(mut self, runner: impl Runner) -> Self {
        self.members.push(Arc::new(runner));
        self
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if there are no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FromIterator<RunnerRef> for Sequence {
    fn from_iter<I: IntoIterator<Item = RunnerRef>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[async_trait]
impl Runner for Sequence {
    async fn run(&self, ctx: Context) -> Result<(), RunError> {
        let len = self.members.len();
        for (index, member) in self.members.iter().enumerate() {
            if let Err(e) = member.run(ctx.clone()).await {
                return Err(RunError::Sequence {
                    index,
                    len,
                    source: Box::new(e),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RunFn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("inner")]
    struct Inner;

    fn counter(count: &Arc<AtomicUsize>) -> RunnerRef {
        let count = Arc::clone(count);
        RunFn::arc(move |_ctx: Context| {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let count = Arc::new(AtomicUsize::new(0));
        let seq = Sequence::new(vec![counter(&count), counter(&count)]);

        seq.run(Context::new()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);

        // stateless: a second run repeats the work
        seq.run(Context::new()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_stop_on_failure() {
        let before = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let fail: RunnerRef = RunFn::arc(|_ctx: Context| async { Err(RunError::other(Inner)) });
        let seq = Sequence::new(vec![counter(&before), fail, counter(&after)]);

        let err = seq.run(Context::new()).await.unwrap_err();
        assert!(err.find::<Inner>().is_some());
        assert!(matches!(err, RunError::Sequence { index: 1, len: 3, .. }));
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_sequence() {
        assert!(Sequence::default().run(Context::new()).await.is_ok());
    }
}
