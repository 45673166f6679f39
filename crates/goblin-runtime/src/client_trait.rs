//! # LifecycleClient Trait
//!
//! Awaitable lifecycle notifications for anything that can reach a goblin,
//! built on top of the handler-based API.
use crate::error::{LifecycleError, Outcome};
use crate::handle::ActorRef;
use async_trait::async_trait;
use tokio::sync::oneshot;

/// Futures over birth and death, provided for [`Handle`](crate::Handle) and
/// [`ActorRef`](crate::ActorRef).
///
/// Implementors only hand out an [`ActorRef`], so a client never holds the
/// goblin alive: dropping the last [`Handle`](crate::Handle) destroys it even
/// while a future is pending.
///
/// The outcome is still produced on the service's primary executor, so something
/// must be driving that executor for a future to resolve. A notification that
/// is dropped without firing (a birth waiter on a goblin that died unborn, or a
/// post onto a stopped executor) resolves to [`LifecycleError::Abandoned`].
///
/// # Example
///
/// ```rust,no_run
/// use goblin_runtime::{ActorService, ExecutorContext, Handle, LifecycleClient, RuntimeConfig};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let executor = ExecutorContext::new("primary");
/// let service = ActorService::new(&executor, RuntimeConfig::default())?;
///
/// let goblin = Handle::new(&service);
/// goblin.be_born();
/// goblin.birth().await?;
/// goblin.die();
/// goblin.death().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait LifecycleClient: Send + Sync {
    /// Non-owning reference to the goblin this client talks about.
    fn actor_ref(&self) -> ActorRef;

    /// Resolves once the goblin is born.
    #[tracing::instrument(skip(self))]
    async fn birth(&self) -> Outcome {
        tracing::debug!("Awaiting birth");
        let (tx, rx) = oneshot::channel();
        let target = self.actor_ref();
        let Some(instance) = target.upgrade() else {
            return Err(LifecycleError::Aborted);
        };
        target.service().on_birth(&instance, move |outcome| {
            let _ = tx.send(outcome);
        });
        drop(instance);
        rx.await.unwrap_or(Err(LifecycleError::Abandoned))
    }

    /// Resolves once the goblin is dead.
    #[tracing::instrument(skip(self))]
    async fn death(&self) -> Outcome {
        tracing::debug!("Awaiting death");
        let (tx, rx) = oneshot::channel();
        let target = self.actor_ref();
        let Some(instance) = target.upgrade() else {
            return Err(LifecycleError::Aborted);
        };
        target.service().wait_death(&instance, move |outcome| {
            let _ = tx.send(outcome);
        });
        drop(instance);
        rx.await.unwrap_or(Err(LifecycleError::Abandoned))
    }
}
