//! # Example: group_shutdown
//!
//! Three members share one group. The `flaky` member fails after a moment, which
//! cancels its siblings: `worker` stops promptly, `stubborn` ignores cancellation and
//! is reported as stuck once the shutdown timeout passes.
//!
//! ## Flow
//! ```text
//! Group::run()
//!     ├─► flaky    ── 300ms ──► Err("disk full")        ─► cause, cancel siblings
//!     ├─► worker   ── ctx.cancelled() ──► Ok(())
//!     └─► stubborn ── sleep(1h), never checks ctx        ─► stuck after 1s
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example group_shutdown
//! ```

use std::time::Duration;

use runvisor::{Context, Group, RunError, RunFn, Runner};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let group = Group::new()
        .with_member(
            "flaky",
            RunFn::new(|_ctx: Context| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Err(RunError::other("disk full"))
            }),
        )
        .with_member(
            "worker",
            RunFn::new(|ctx: Context| async move {
                println!("[worker] running");
                ctx.cancelled().await;
                println!("[worker] cancelled, exiting");
                Ok(())
            }),
        )
        .with_member(
            "stubborn",
            RunFn::new(|_ctx: Context| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok::<_, RunError>(())
            }),
        )
        .with_shutdown_timeout(Duration::from_secs(1));

    let err = match group.run(Context::new().on_shutdown_signal()).await {
        Ok(()) => {
            println!("group finished cleanly");
            return Ok(());
        }
        Err(err) => err,
    };

    println!("group failed: {err}");
    println!("  label: {}", err.as_label());
    if let Some(stuck) = err.stuck() {
        println!("  stuck members: {stuck:?}");
    }
    for (depth, link) in err.chain().enumerate() {
        println!("  {depth}: {}", link.as_label());
    }
    Ok(())
}
