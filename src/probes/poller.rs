//! # Network readiness poller.
//!
//! [`Poller`] pokes an address until it answers, pausing between attempts according
//! to a [`BackoffPolicy`] (10ms doubling up to 1s by default, optionally jittered
//! with [`Poller::with_jitter`]).
//!
//! ## Modes
//! - [`PollMode::Tcp`]: ready once a TCP connection is accepted.
//! - [`PollMode::Http`]: ready once `OPTIONS * HTTP/1.1` gets a response whose status
//!   is not `502 Bad Gateway` or `504 Gateway Timeout` (a proxy with nothing behind it).
//!
//! ## Rules
//! - Every poke is bounded by the poke timeout (200ms by default).
//! - An address without a port gets `:80`.
//! - Cancellation of the context ends polling with [`PollerError::Cancelled`], which
//!   carries the last poke failure.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;

use crate::{
    context::Context,
    error::RunError,
    policies::{BackoffPolicy, JitterPolicy},
    runners::Runner,
};

/// Default bound on a single poke.
pub const POKE_TIMEOUT: Duration = Duration::from_millis(200);

/// Why a single poke failed.
#[derive(Debug, Error)]
pub enum PokeError {
    #[error("failed to dial: {0}")]
    Dial(#[source] io::Error),
    #[error("failed to write OPTIONS request: {0}")]
    Write(#[source] io::Error),
    #[error("failed to read OPTIONS response: {0}")]
    Read(#[source] io::Error),
    #[error("poke timed out")]
    TimedOut,
    #[error("target unavailable: {0}")]
    Unavailable(&'static str),
}

/// Terminal poller failures.
#[derive(Debug, Error)]
pub enum PollerError {
    #[error("invalid poll address {0:?}")]
    InvalidAddr(String),
    #[error("poller cancelled waiting for target to be ready: last err: {last}")]
    Cancelled {
        #[source]
        last: PokeError,
    },
}

/// What a poke checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollMode {
    Tcp,
    Http,
}

/// Runner that completes once an address is ready to take traffic.
///
/// # Example
/// ```no_run
/// use runvisor::{Context, Poller, Runner};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ctx = Context::new().with_timeout(std::time::Duration::from_secs(5));
/// Poller::http("localhost:8080").run(ctx).await.unwrap();
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Poller {
    addr: String,
    mode: PollMode,
    backoff: BackoffPolicy,
    poke_timeout: Duration,
}

impl Poller {
    /// Polls until a TCP connection to `addr` succeeds.
    pub fn tcp(addr: impl Into<String>) -> Self {
        Self::new(addr, PollMode::Tcp)
    }

    /// Polls until `addr` answers an HTTP `OPTIONS *` request.
    pub fn http(addr: impl Into<String>) -> Self {
        Self::new(addr, PollMode::Http)
    }

    pub fn new(addr: impl Into<String>, mode: PollMode) -> Self {
        Self {
            addr: addr.into(),
            mode,
            backoff: BackoffPolicy::poller(),
            poke_timeout: POKE_TIMEOUT,
        }
    }

    /// Replaces the pause schedule between pokes.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Randomizes the pauses between pokes, e.g. when many pollers start together.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.backoff.jitter = jitter;
        self
    }

    /// Replaces the bound on a single poke.
    pub fn with_poke_timeout(mut self, timeout: Duration) -> Self {
        self.poke_timeout = timeout;
        self
    }

    async fn poke(&self, addr: &str, host: &str) -> Result<(), PokeError> {
        time::timeout(self.poke_timeout, self.poke_once(addr, host))
            .await
            .unwrap_or(Err(PokeError::TimedOut))
    }

    async fn poke_once(&self, addr: &str, host: &str) -> Result<(), PokeError> {
        let mut stream = TcpStream::connect(addr).await.map_err(PokeError::Dial)?;
        if self.mode == PollMode::Tcp {
            return Ok(());
        }

        let request = format!("OPTIONS * HTTP/1.1\r\nHost: {host}\r\n\r\n");
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(PokeError::Write)?;

        // "HTTP/1.1 502"
        let mut head = [0u8; 12];
        stream
            .read_exact(&mut head)
            .await
            .map_err(PokeError::Read)?;
        match head.split(|b| *b == b' ').nth(1) {
            Some(b"502") => Err(PokeError::Unavailable("502 Bad Gateway")),
            Some(b"504") => Err(PokeError::Unavailable("504 Gateway Timeout")),
            _ => Ok(()),
        }
    }
}

/// Splits `addr` into the dial address and the `Host` header value, adding `:80`
/// when no port is given.
fn resolve_target(addr: &str) -> Result<(String, String), PollerError> {
    let invalid = || PollerError::InvalidAddr(addr.to_string());

    let dial = match addr.rsplit_once(':') {
        Some((host, port)) if port.parse::<u16>().is_ok() && !host.is_empty() => {
            if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
                return Err(invalid());
            }
            addr.to_string()
        }
        _ if addr.starts_with('[') && addr.ends_with(']') => format!("{addr}:80"),
        None if !addr.is_empty() => format!("{addr}:80"),
        _ => return Err(invalid()),
    };

    let host = dial
        .rsplit_once(':')
        .map(|(host, _)| host.to_string())
        .ok_or_else(invalid)?;
    Ok((dial, host))
}

#[async_trait]
impl Runner for Poller {
    async fn run(&self, ctx: Context) -> Result<(), RunError> {
        let (addr, host) = resolve_target(&self.addr).map_err(RunError::other)?;

        let mut attempt = 0u32;
        loop {
            let last = match self.poke(&addr, &host).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            tokio::select! {
                _ = ctx.cancelled() => {
                    return Err(RunError::other(PollerError::Cancelled { last }));
                }
                _ = time::sleep(self.backoff.next(attempt)) => {}
            }
            attempt = attempt.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RunFn, start};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    async fn serve_status(status: &'static str) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 256];
                let _ = stream.read(&mut buf).await;
                let response = format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\n\r\n");
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });
        (addr, handle)
    }

    #[test]
    fn test_resolve_target() {
        let (dial, host) = resolve_target("localhost").unwrap();
        assert_eq!((dial.as_str(), host.as_str()), ("localhost:80", "localhost"));

        let (dial, host) = resolve_target("127.0.0.1:8080").unwrap();
        assert_eq!((dial.as_str(), host.as_str()), ("127.0.0.1:8080", "127.0.0.1"));

        let (dial, host) = resolve_target("[::1]").unwrap();
        assert_eq!((dial.as_str(), host.as_str()), ("[::1]:80", "[::1]"));

        assert!(resolve_target("[::1]:9000").is_ok());
        assert!(resolve_target("::1").is_err());
        assert!(resolve_target("").is_err());
    }

    #[tokio::test]
    async fn test_tcp_ready() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let ctx = Context::new().with_timeout(Duration::from_secs(5));
        assert!(Poller::tcp(addr).run(ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_http_ready() {
        let (addr, server) = serve_status("204 No Content").await;

        let ctx = Context::new().with_timeout(Duration::from_secs(5));
        assert!(Poller::http(addr).run(ctx).await.is_ok());
        server.abort();
    }

    #[tokio::test]
    async fn test_http_bad_gateway_is_not_ready() {
        let (addr, server) = serve_status("502 Bad Gateway").await;

        let ctx = Context::new().with_timeout(Duration::from_millis(300));
        let err = Poller::http(addr).run(ctx).await.unwrap_err();
        assert!(
            err.to_string()
                .starts_with("poller cancelled waiting for target to be ready")
        );
        assert!(matches!(
            err.find::<PokeError>(),
            Some(PokeError::Unavailable("502 Bad Gateway"))
        ));
        server.abort();
    }

    #[tokio::test]
    async fn test_absent_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let ctx = Context::new().with_timeout(Duration::from_millis(200));
        let err = Poller::tcp(addr).run(ctx).await.unwrap_err();
        assert!(matches!(
            err.find::<PollerError>(),
            Some(PollerError::Cancelled { .. })
        ));
    }

    #[tokio::test]
    async fn test_jittered_poller_reaches_late_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let late = addr.clone();
        let server = tokio::spawn(async move {
            time::sleep(Duration::from_millis(50)).await;
            let listener = TcpListener::bind(late).await.unwrap();
            let _ = listener.accept().await;
        });

        let poller = Poller::tcp(addr).with_jitter(JitterPolicy::Equal);
        assert_eq!(poller.backoff.jitter, JitterPolicy::Equal);

        let ctx = Context::new().with_timeout(Duration::from_secs(5));
        assert!(poller.run(ctx).await.is_ok());
        server.abort();
    }

    #[tokio::test]
    async fn test_start_gated_on_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let slot = Arc::new(Mutex::new(Some(listener)));

        let server = RunFn::new(move |ctx: Context| {
            let listener = slot.lock().unwrap().take();
            async move {
                let Some(listener) = listener else {
                    return Err(RunError::other("listener already taken"));
                };
                loop {
                    tokio::select! {
                        _ = ctx.cancelled() => return Ok(()),
                        res = listener.accept() => drop(res),
                    }
                }
            }
        });

        let ctx = Context::new().with_timeout(Duration::from_secs(5));
        let started = start(&ctx, server, Poller::tcp(addr)).await.unwrap();
        assert!(started.shutdown().await.is_ok());
    }
}
