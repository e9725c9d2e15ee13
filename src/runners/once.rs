//! # Single-shot memoization.
//!
//! [`Once`] runs the wrapped runner the first time it is invoked and replays the
//! cached outcome to every later (or concurrent) caller.
//!
//! ## Rules
//! - Exactly one execution: concurrent first callers wait for it to finish.
//! - Every caller receives a clone of the **same** outcome, errors included.
//! - A panic in the wrapped runner is contained and cached like any other error.
//! - The context of the first caller is the one the wrapped runner sees.
//! - The execution runs on its own task: a first caller that gives up (dropped by a
//!   `select!` or a timeout) does not abort it, and later callers join it.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::{
    context::Context,
    core::recover::{from_panic, run_contained},
    error::RunError,
    runners::Runner,
};

type Execution = Shared<BoxFuture<'static, Result<(), RunError>>>;

/// Runner that executes its inner runner at most once.
///
/// # Example
/// ```
/// use runvisor::{Context, Once, RunFn, Runner};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let r = Once::new(RunFn::new(|_ctx: Context| async {
///     println!("Hello, World!");
///     Ok(())
/// }));
/// r.run(Context::new()).await.unwrap();
/// r.run(Context::new()).await.unwrap(); // prints nothing
/// # }
/// ```
pub struct Once<R> {
    inner: Arc<R>,
    execution: OnceLock<Execution>,
}

impl<R: Runner> Once<R> {
    /// Wraps `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner: Arc::new(inner),
            execution: OnceLock::new(),
        }
    }

    /// Wraps `inner` and returns it as a shared handle.
    pub fn arc(inner: R) -> Arc<Self> {
        Arc::new(Self::new(inner))
    }

    /// The cached outcome, if the inner runner has already completed.
    pub fn outcome(&self) -> Option<&Result<(), RunError>> {
        self.execution.get().and_then(|execution| execution.peek())
    }
}

#[async_trait]
impl<R: Runner> Runner for Once<R> {
    async fn run(&self, ctx: Context) -> Result<(), RunError> {
        let execution = self.execution.get_or_init(|| {
            let inner = Arc::clone(&self.inner);
            let task = tokio::spawn(async move { run_contained(&*inner, ctx).await });
            async move {
                match task.await {
                    Ok(outcome) => outcome,
                    Err(err) if err.is_panic() => Err(from_panic(err.into_panic())),
                    Err(_) => Err(RunError::Canceled),
                }
            }
            .boxed()
            .shared()
        });
        execution.clone().await
    }
}
