//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [starting] member="db"
//! [failed] member="db" err="group[db]: connection refused"
//! [shutdown-requested] member="db" cause="connection refused" timeout_ms=10000
//! [stopped] member="http"
//! [all-stopped-within]
//! [timeout-exceeded] stuck="[cache]" timeout_ms=10000
//! [ready]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let member = e.member.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::MemberStarting => println!("[starting] member={member:?}"),
            EventKind::MemberStopped => println!("[stopped] member={member:?}"),
            EventKind::MemberFailed => println!("[failed] member={member:?} err={reason:?}"),
            EventKind::MemberPanicked => println!("[panicked] member={member:?} info={reason:?}"),
            EventKind::ShutdownRequested => println!(
                "[shutdown-requested] member={member:?} cause={reason:?} timeout_ms={:?}",
                e.timeout_ms
            ),
            EventKind::AllStoppedWithin => println!("[all-stopped-within]"),
            EventKind::TimeoutExceeded => println!(
                "[timeout-exceeded] stuck={reason:?} timeout_ms={:?}",
                e.timeout_ms
            ),
            EventKind::RunnerReady => println!("[ready]"),
            EventKind::RunnerNotReady => println!("[not-ready] err={reason:?}"),
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={member} reason={reason}")
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] subscriber={member} info={reason}")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
