//! # Runner abstractions and simple composites.
//!
//! This module provides:
//! - [`Runner`] - trait for implementing async cancelable units of work
//! - [`RunFn`] - closure-backed runner
//! - [`RunnerRef`] - shared reference to a runner (`Arc<dyn Runner>`)
//! - [`Sequence`] - ordered composition
//! - [`Once`] - single-shot memoization
//! - [`Idle`] - waits for cancellation
//!
//! The concurrent composite, [`Group`](crate::Group), lives in `core`.

mod idle;
mod once;
mod run_fn;
mod runner;
mod sequence;

pub use idle::Idle;
pub use once::Once;
pub use run_fn::RunFn;
pub use runner::{Runner, RunnerRef};
pub use sequence::Sequence;
