//! Fire-and-forget execution with the outcome delivered over a channel.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{context::Context, core::recover::run_contained, error::RunError, runners::Runner};

/// Spawns `runner` on its own task and sends its outcome on `done`.
///
/// Panics are converted the same way [`Group`](crate::Group) converts them. If the
/// receiver is gone the outcome is dropped.
///
/// # Example
/// ```
/// use runvisor::{Context, RunFn, detach};
/// use tokio::sync::mpsc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (tx, mut rx) = mpsc::channel(1);
/// detach(Context::new(), RunFn::new(|_ctx: Context| async { Ok(()) }), tx);
/// assert!(rx.recv().await.unwrap().is_ok());
/// # }
/// ```
pub fn detach(
    ctx: Context,
    runner: impl Runner,
    done: mpsc::Sender<Result<(), RunError>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = run_contained(&runner, ctx).await;
        let _ = done.send(outcome).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RunFn;

    #[derive(Debug, thiserror::Error)]
    #[error("inner")]
    struct Inner;

    fn explode() -> Result<(), RunError> {
        std::panic::panic_any(RunError::other(Inner))
    }

    #[tokio::test]
    async fn test_outcomes_are_delivered() {
        let (tx, mut rx) = mpsc::channel(4);

        detach(
            Context::new(),
            RunFn::new(|_ctx: Context| async { Ok::<_, RunError>(()) }),
            tx.clone(),
        )
        .await
        .unwrap();
        assert!(rx.recv().await.unwrap().is_ok());

        detach(
            Context::new(),
            RunFn::new(|_ctx: Context| async { Err(RunError::other(Inner)) }),
            tx,
        );
        let err = rx.recv().await.unwrap().unwrap_err();
        assert!(err.find::<Inner>().is_some());
    }

    #[tokio::test]
    async fn test_panics_are_contained() {
        let (tx, mut rx) = mpsc::channel(2);

        detach(
            Context::new(),
            RunFn::new(|_ctx: Context| async { explode() }),
            tx.clone(),
        );
        let err = rx.recv().await.unwrap().unwrap_err();
        assert!(matches!(err, RunError::Recovered { .. }));
        assert!(err.find::<Inner>().is_some());

        detach(
            Context::new(),
            RunFn::new(|ctx: Context| async move {
                if !ctx.is_cancelled() {
                    panic!("eek");
                }
                Ok(())
            }),
            tx,
        );
        let err = rx.recv().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("eek"));
    }

    #[tokio::test]
    async fn test_closed_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let handle = detach(
            Context::new(),
            RunFn::new(|_ctx: Context| async { Ok::<_, RunError>(()) }),
            tx,
        );
        assert!(handle.await.is_ok());
    }
}
