//! # Runner abstraction.
//!
//! This module defines the [`Runner`] trait (async, cancelable) and the shared
//! handle [`RunnerRef`], an `Arc<dyn Runner>` suitable for composing heterogeneous
//! runners (closures, structs, composites) into one tree.
//!
//! A runner receives a [`Context`] and must return in bounded time once it is
//! cancelled. The contract is cooperative; nothing in the crate aborts a runner.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{context::Context, error::RunError};

/// # Shared handle to a runner.
///
/// This is the primary type stored by composites.
pub type RunnerRef = Arc<dyn Runner>;

/// # Asynchronous, cancelable unit of work.
///
/// `run` executes until done or until `ctx` is cancelled.
/// `Ok(())` means the runner completed successfully and is not expected to be relaunched.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use runvisor::{Context, RunError, Runner};
///
/// struct Demo;
///
/// #[async_trait]
/// impl Runner for Demo {
///     async fn run(&self, ctx: Context) -> Result<(), RunError> {
///         if let Some(err) = ctx.err() {
///             return Err(err);
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Runs until completion or cancellation of `ctx`.
    ///
    /// Implementations must not keep `ctx` after returning.
    async fn run(&self, ctx: Context) -> Result<(), RunError>;
}

#[async_trait]
impl<R: Runner + ?Sized> Runner for Arc<R> {
    async fn run(&self, ctx: Context) -> Result<(), RunError> {
        (**self).run(ctx).await
    }
}

#[async_trait]
impl<R: Runner + ?Sized> Runner for Box<R> {
    async fn run(&self, ctx: Context) -> Result<(), RunError> {
        (**self).run(ctx).await
    }
}
