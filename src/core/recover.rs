//! Panic containment shared by every task boundary (group members, `detach`, `Once`).
//!
//! A panic payload becomes:
//! - [`RunError::Recovered`] wrapping the payload when it is a `RunError`
//!   (`std::panic::panic_any(err)`) or a boxed error;
//! - [`RunError::Panic`] with the payload's message otherwise.

use std::any::Any;
use std::error::Error as StdError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::{context::Context, error::RunError, runners::Runner};

/// Runs `runner`, turning a panic into an error.
pub(crate) async fn run_contained<R: Runner + ?Sized>(
    runner: &R,
    ctx: Context,
) -> Result<(), RunError> {
    AssertUnwindSafe(runner.run(ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(from_panic(payload)))
}

/// Converts a caught panic payload into a [`RunError`].
pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> RunError {
    let payload = match payload.downcast::<RunError>() {
        Ok(err) => return RunError::Recovered { source: err },
        Err(other) => other,
    };
    match payload.downcast::<Box<dyn StdError + Send + Sync>>() {
        Ok(err) => RunError::Recovered {
            source: Box::new(RunError::Failed(Arc::from(*err))),
        },
        Err(other) => RunError::Panic {
            message: panic_message(other.as_ref()),
        },
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(err) = payload.downcast_ref::<RunError>() {
        err.to_string()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RunFn;

    #[derive(Debug, thiserror::Error)]
    #[error("inner")]
    struct Inner;

    fn catch(f: impl FnOnce() + std::panic::UnwindSafe) -> RunError {
        match std::panic::catch_unwind(f) {
            Ok(()) => panic!("closure did not panic"),
            Err(payload) => from_panic(payload),
        }
    }

    #[test]
    fn test_run_error_payload_is_wrapped() {
        let err = catch(|| std::panic::panic_any(RunError::other(Inner)));
        assert!(matches!(err, RunError::Recovered { .. }));
        assert!(err.find::<Inner>().is_some());
    }

    #[test]
    fn test_boxed_error_payload_is_wrapped() {
        let err = catch(|| {
            let boxed: Box<dyn StdError + Send + Sync> = Box::new(Inner);
            std::panic::panic_any(boxed)
        });
        assert!(err.find::<Inner>().is_some());
    }

    #[test]
    fn test_message_payloads() {
        let err = catch(|| panic!("eek"));
        assert_eq!(err.to_string(), "recovered panic: eek");

        let err = catch(|| panic!("code {}", 7));
        assert_eq!(err.to_string(), "recovered panic: code 7");

        let err = catch(|| std::panic::panic_any(42_u8));
        assert_eq!(err.to_string(), "recovered panic: unknown panic");
    }

    #[tokio::test]
    async fn test_run_contained() {
        let ok = RunFn::new(|_ctx: Context| async { Ok::<_, RunError>(()) });
        assert!(run_contained(&ok, Context::new()).await.is_ok());

        let boom = RunFn::new(|ctx: Context| async move {
            if !ctx.is_cancelled() {
                panic!("boom");
            }
            Ok(())
        });
        let err = run_contained(&boom, Context::new()).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
