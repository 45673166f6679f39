//! # Asynchronous Handler Dispatch
//!
//! Handlers registered by clients are never called on the thread that happens
//! to process the lifecycle event. [`completion`] wraps a handler into a
//! [`Notify`] that, when invoked, posts the real handler onto a destination
//! executor.
//!
//! The wrapper holds a [`KeepAlive`](crate::executor::KeepAlive) on that executor
//! from the moment it is created until the post happens, so a client running
//! the executor "to completion" keeps running while any notification it asked
//! for is still outstanding.

use crate::error::Outcome;
use crate::executor::ExecutorContext;
use tracing::trace;

/// A one-shot lifecycle notification.
///
/// `FnOnce` makes at-most-once delivery a property of the type.
pub type Notify = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// Wraps `handler` so that it runs on `executor` when notified.
pub fn completion<H>(executor: &ExecutorContext, handler: H) -> Notify
where
    H: FnOnce(Outcome) + Send + 'static,
{
    let keep_alive = executor.keep_alive();
    Box::new(move |outcome: Outcome| {
        let executor = keep_alive.executor();
        trace!(executor = executor.name(), ok = outcome.is_ok(), "Posting notification");
        executor.post(move || handler(outcome));
        // Released only after the post is queued, so the outstanding count
        // never dips to zero in between.
        drop(keep_alive);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LifecycleError;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_completion_posts_instead_of_calling_inline() {
        let executor = ExecutorContext::new("dispatch-test");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let notify = completion(&executor, move |outcome| s.lock().push(outcome));

        assert_eq!(executor.outstanding(), 1, "keep-alive held while pending");
        notify(Err(LifecycleError::ActuallyDead));
        assert!(seen.lock().is_empty(), "handler must not run inline");
        assert_eq!(executor.outstanding(), 1, "queued task replaced the keep-alive");

        executor.run();
        assert_eq!(*seen.lock(), vec![Err(LifecycleError::ActuallyDead)]);
    }

    #[test]
    fn test_dropped_notification_releases_keep_alive() {
        let executor = ExecutorContext::new("dispatch-test");
        let notify = completion(&executor, |_| {});
        assert_eq!(executor.outstanding(), 1);
        drop(notify);
        assert_eq!(executor.outstanding(), 0);
    }
}
