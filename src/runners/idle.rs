use async_trait::async_trait;

use crate::{context::Context, error::RunError, runners::Runner};

/// Runner that does nothing until its context is cancelled, then returns `Ok(())`.
///
/// Useful as the last member of a [`Sequence`](crate::Sequence) inside a
/// [`Group`](crate::Group): the sequence stays alive once its real work is done
/// instead of being treated as an early exit.
#[derive(Clone, Copy, Debug, Default)]
pub struct Idle;

#[async_trait]
impl Runner for Idle {
    async fn run(&self, ctx: Context) -> Result<(), RunError> {
        ctx.cancelled().await;
        Ok(())
    }
}
