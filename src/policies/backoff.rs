//! # Exponential backoff between retry attempts.
//!
//! The pause before retry `n` (0-indexed) is `first × factor^n`, capped at `max`, with
//! jitter applied last. Each attempt derives its pause from `n` alone, so jitter never
//! compounds.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use runvisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy::poller();
//! assert_eq!(backoff.next(0), Duration::from_millis(10));
//! assert_eq!(backoff.next(3), Duration::from_millis(80));
//! assert_eq!(backoff.next(20), Duration::from_secs(1));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Pause before the first retry.
    pub first: Duration,
    /// Upper bound of any pause.
    pub max: Duration,
    /// Growth factor per attempt (`>= 1.0` for a growing pause).
    pub factor: f64,
    /// Randomization applied to every pause.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Same as [`BackoffPolicy::poller`].
    fn default() -> Self {
        Self::poller()
    }
}

impl BackoffPolicy {
    /// Readiness polling cadence: 10ms doubling up to 1s, no jitter.
    pub const fn poller() -> Self {
        Self {
            first: Duration::from_millis(10),
            max: Duration::from_secs(1),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Pause before retry number `attempt` (0-indexed).
    pub fn next(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poller_cadence() {
        let policy = BackoffPolicy::poller();
        let pauses: Vec<_> = (0..8).map(|n| policy.next(n).as_millis()).collect();
        assert_eq!(pauses, vec![10, 20, 40, 80, 160, 320, 640, 1000]);
    }

    #[test]
    fn test_first_above_max_is_capped() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(10),
            max: Duration::from_secs(5),
            ..BackoffPolicy::poller()
        };
        assert_eq!(policy.next(0), Duration::from_secs(5));
    }

    #[test]
    fn test_overflow_is_capped() {
        let policy = BackoffPolicy::poller();
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_constant_factor() {
        let policy = BackoffPolicy {
            factor: 1.0,
            ..BackoffPolicy::poller()
        };
        assert!((0..20).all(|n| policy.next(n) == Duration::from_millis(10)));
    }

    #[test]
    fn test_jitter_stays_under_base() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Full,
            ..BackoffPolicy::poller()
        };
        for n in 0..12 {
            let base = BackoffPolicy::poller().next(n);
            assert!(policy.next(n) <= base);
        }
    }
}
