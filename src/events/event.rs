//! # Lifecycle events emitted by groups and the start helper.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Member events**: one member of a group (starting, stopped, failed, panicked)
//! - **Shutdown events**: the group's shutdown phase (requested, finished, timed out)
//! - **Readiness / subscriber events**: `start` outcome and subscriber health
//!
//! The [`Event`] struct carries additional metadata such as timestamps, member name,
//! reasons, and the shutdown timeout.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use runvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::MemberFailed)
//!     .with_member("db")
//!     .with_reason("boom")
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::MemberFailed);
//! assert_eq!(ev.member.as_deref(), Some("db"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `member`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `member`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Member events ===
    /// A group member is being launched.
    ///
    /// Sets:
    /// - `member`: member name
    MemberStarting,

    /// A group member returned `Ok(())`.
    ///
    /// Sets:
    /// - `member`: member name
    MemberStopped,

    /// A group member returned an error (panics included).
    ///
    /// Sets:
    /// - `member`: member name
    /// - `reason`: error message
    MemberFailed,

    /// A group member panicked; always followed by `MemberFailed`.
    ///
    /// Sets:
    /// - `member`: member name
    /// - `reason`: panic message
    MemberPanicked,

    // === Shutdown events ===
    /// The group recorded its cause and cancelled the remaining members.
    ///
    /// Sets:
    /// - `member`: member whose exit is the cause
    /// - `reason`: the cause
    /// - `timeout_ms`: shutdown timeout now armed
    ShutdownRequested,

    /// Every member reported back after shutdown was requested.
    AllStoppedWithin,

    /// Shutdown timeout exceeded; some members did not exit in time.
    ///
    /// Sets:
    /// - `reason`: names of the stuck members
    /// - `timeout_ms`: the exceeded timeout
    TimeoutExceeded,

    // === Readiness events ===
    /// `start` observed the readiness probe succeed.
    RunnerReady,

    /// `start` gave up before readiness.
    ///
    /// Sets:
    /// - `reason`: why readiness was never reached
    RunnerNotReady,
}

impl EventKind {
    /// True for reports about the health of a subscriber itself.
    pub fn is_subscriber_report(self) -> bool {
        matches!(
            self,
            EventKind::SubscriberPanicked | EventKind::SubscriberOverflow
        )
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Shutdown timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, stuck members, overflow details).
    pub reason: Option<Arc<str>>,
    /// Name of the group member (or subscriber), if applicable.
    pub member: Option<Arc<str>>,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            timeout_ms: None,
            reason: None,
            member: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a member name.
    #[inline]
    pub fn with_member(mut self, member: impl Into<Arc<str>>) -> Self {
        self.member = Some(member.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_member(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_member(subscriber)
            .with_reason(info)
    }
}
