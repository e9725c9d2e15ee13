//! # Jitter applied to retry pauses.
//!
//! - [`JitterPolicy::None`]: exact pause
//! - [`JitterPolicy::Full`]: random pause in `[0, pause]`
//! - [`JitterPolicy::Equal`]: `pause/2 + random[0, pause/2]`

use std::time::Duration;

use rand::Rng;

/// Randomization of a retry pause.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No randomization.
    #[default]
    None,
    /// Anywhere between zero and the pause.
    Full,
    /// At least half of the pause.
    Equal,
}

impl JitterPolicy {
    /// Applies the jitter to `pause`.
    pub fn apply(&self, pause: Duration) -> Duration {
        let ms = pause.as_millis().min(u128::from(u64::MAX)) as u64;
        if ms == 0 {
            return pause;
        }
        let mut rng = rand::rng();
        match self {
            JitterPolicy::None => pause,
            JitterPolicy::Full => Duration::from_millis(rng.random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + rng.random_range(0..=ms - half))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_exact() {
        let pause = Duration::from_millis(250);
        assert_eq!(JitterPolicy::None.apply(pause), pause);
    }

    #[test]
    fn test_bounds() {
        let pause = Duration::from_millis(1000);
        for _ in 0..100 {
            assert!(JitterPolicy::Full.apply(pause) <= pause);

            let equal = JitterPolicy::Equal.apply(pause);
            assert!(equal >= Duration::from_millis(500) && equal <= pause);
        }
    }

    #[test]
    fn test_zero_pause() {
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
