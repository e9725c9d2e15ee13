//! # Function-backed runner (`RunFn`)
//!
//! [`RunFn`] wraps a closure `F: Fn(Context) -> Fut`, producing a fresh future per
//! run. There is no hidden mutation between runs; if state must be shared, capture
//! an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use runvisor::{Context, RunError, RunFn, RunnerRef};
//!
//! let r: RunnerRef = RunFn::arc(|ctx: Context| async move {
//!     if ctx.is_cancelled() {
//!         return Ok(());
//!     }
//!     // do work...
//!     Ok::<_, RunError>(())
//! });
//! # let _ = r;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{context::Context, error::RunError, runners::Runner};

/// Function-backed runner implementation.
pub struct RunFn<F> {
    f: F,
}

impl<F> fmt::Debug for RunFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunFn").finish_non_exhaustive()
    }
}

impl<F> RunFn<F> {
    /// Creates a new function-backed runner.
    ///
    /// Prefer [`RunFn::arc`] when you immediately need a [`RunnerRef`](crate::RunnerRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the runner and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Runner for RunFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), RunError>> + Send + 'static,
{
    async fn run(&self, ctx: Context) -> Result<(), RunError> {
        (self.f)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("inner")]
    struct Inner;

    #[tokio::test]
    async fn test_closure_sees_context() {
        let r = RunFn::new(|ctx: Context| async move {
            match ctx.err() {
                Some(err) => Err(err),
                None => Err(RunError::other(Inner)),
            }
        });

        let err = r.run(Context::new()).await.unwrap_err();
        assert!(err.find::<Inner>().is_some());

        let ctx = Context::new();
        ctx.cancel();
        let err = r.run(ctx).await.unwrap_err();
        assert!(err.is_canceled());
    }
}
