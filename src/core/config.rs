//! # Group configuration.
//!
//! Provides [`Config`], the settings shared by [`Group`](crate::Group) and the
//! [`start`](crate::start) helper.
//!
//! ## Sentinel values
//! - `shutdown_timeout = 0s` → members must already be done when the cause is
//!   recorded; anything still running is reported as stuck on the next tick.
//! - `bus_capacity = 0` → clamped to 1 by [`Bus`].

use std::time::Duration;

use crate::events::Bus;

/// Default bound on how long cancelled members may take to exit.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for group supervision.
///
/// ## Field semantics
/// - `shutdown_timeout`: how long a group waits for its members after recording a
///   cause (or after observing parent cancellation) before giving up with
///   [`RunError::Timeout`](crate::RunError::Timeout)
/// - `bus_capacity`: ring buffer size for a [`Bus`] built with [`Config::bus`]
#[derive(Clone, Debug)]
pub struct Config {
    /// Bound on member exit after cancellation. Detection only: stuck members are
    /// reported, never aborted.
    pub shutdown_timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Builds a [`Bus`] sized by this config.
    pub fn bus(&self) -> Bus {
        Bus::new(self.bus_capacity_clamped())
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `shutdown_timeout = 10s` ([`SHUTDOWN_TIMEOUT`])
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            shutdown_timeout: SHUTDOWN_TIMEOUT,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(cfg.bus_capacity_clamped(), 1024);

        let tiny = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(tiny.bus_capacity_clamped(), 1);
    }
}
