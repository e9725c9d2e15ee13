//! Readiness probes: runners that return `Ok(())` once a target looks ready.
//!
//! Meant as the `probe` half of [`start`](crate::start).

mod poller;

pub use poller::{PokeError, PollMode, Poller, PollerError};
