//! Retry pacing for runners that wait on something outside the process.
//!
//! - [`BackoffPolicy`] how the pause between attempts grows (first / factor / max)
//! - [`JitterPolicy`]  randomization applied on top, to spread out many pollers
//!
//! Used by [`Poller`](crate::Poller); nothing in the group core retries.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
