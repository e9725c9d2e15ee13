//! # Example: start_ready
//!
//! Launches a TCP server and returns control only once a [`Poller`] can connect to it.
//! Lifecycle events are printed by the built-in [`LogWriter`].
//!
//! ## Flow
//! ```text
//! Start::new(server, Poller::tcp(addr)).launch()
//!     ├─► group "runner": bind after 500ms, accept until cancelled
//!     └─► group "ready":  Poller ──► publish ──► Idle
//!                           └─► Started  (main continues here)
//!  ...
//! Started::shutdown() ──► cancel ──► Ok(())
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example start_ready --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use runvisor::{Config, Context, LogWriter, Poller, RunError, RunFn, Start, Subscribe, SubscriberSet};
use tokio::net::TcpListener;

const ADDR: &str = "127.0.0.1:7878";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::default();
    let bus = cfg.bus();
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let set = Arc::new(SubscriberSet::new(subs, bus.clone()));
    let listener = set.listen();

    let server = RunFn::new(|ctx: Context| async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let listener = match TcpListener::bind(ADDR).await {
            Ok(listener) => listener,
            Err(err) => return Err(RunError::other(err)),
        };
        println!("[server] listening on {ADDR}");
        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                conn = listener.accept() => {
                    if let Ok((_, peer)) = conn {
                        println!("[server] connection from {peer}");
                    }
                }
            }
        }
    });

    let ctx = Context::new().with_timeout(Duration::from_secs(5));
    let started = Start::new(server, Poller::tcp(ADDR))
        .with_config(cfg)
        .with_bus(bus)
        .launch(&ctx)
        .await?;
    println!("[main] server is ready");

    started.shutdown().await?;
    println!("[main] server stopped");

    tokio::time::sleep(Duration::from_millis(50)).await;
    listener.abort();
    Ok(())
}
