//! # Timers
//!
//! The scheduling facility behind the delayed "killed someone" event.
//!
//! A [`Timer`] runs a callback once after a delay and reports whether the delay
//! elapsed ([`TimerStatus::Fired`]) or the returned [`TimerHandle`] was cancelled
//! first ([`TimerStatus::Cancelled`]). Callbacks run on the timer's own threads;
//! they are expected to hop onto an executor rather than do real work there.
//!
//! [`TokioTimer`] is the production implementation; tests use
//! [`MockTimer`](crate::mock::MockTimer).

use crate::error::RuntimeError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::trace;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Fired,
    Cancelled,
}

pub type TimerCallback = Box<dyn FnOnce(TimerStatus) + Send + 'static>;

pub trait Timer: Send + Sync {
    /// Schedules `callback` to run once `after` has elapsed.
    fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle;
}

/// Cancellation handle for one scheduled callback. Dropping it cancels too.
pub struct TimerHandle {
    id: u64,
    token: CancellationToken,
}

impl TimerHandle {
    /// Creates a handle and the token the timer implementation watches.
    pub fn pair() -> (Self, CancellationToken) {
        let token = CancellationToken::new();
        let handle = Self {
            id: NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed),
            token: token.clone(),
        };
        (handle, token)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// [`Timer`] backed by a small Tokio runtime.
pub struct TokioTimer {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl TokioTimer {
    /// Starts a private single-worker runtime for timers.
    pub fn new() -> Result<Self, RuntimeError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("goblin-timer")
            .enable_time()
            .build()
            .map_err(RuntimeError::TimerStartup)?;
        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    /// Schedules onto an existing runtime instead of owning one.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            runtime: None,
            handle,
        }
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle {
        let (timer, token) = TimerHandle::pair();
        let id = timer.id();
        self.handle.spawn(async move {
            let status = tokio::select! {
                _ = tokio::time::sleep(after) => TimerStatus::Fired,
                _ = token.cancelled() => TimerStatus::Cancelled,
            };
            trace!(timer = id, ?status, "Timer completed");
            callback(status);
        });
        timer
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        // Safe to call from inside another runtime, unlike dropping `Runtime`.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_tokio_timer_fires_after_delay() {
        let timer = TokioTimer::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let _handle = timer.schedule(
            Duration::from_millis(20),
            Box::new(move |status| tx.send(status).unwrap()),
        );
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            TimerStatus::Fired
        );
    }

    #[test]
    fn test_tokio_timer_reports_cancellation() {
        let timer = TokioTimer::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let handle = timer.schedule(
            Duration::from_secs(60),
            Box::new(move |status| tx.send(status).unwrap()),
        );
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            TimerStatus::Cancelled
        );
    }

    #[test]
    fn test_dropping_handle_cancels() {
        let timer = TokioTimer::new().unwrap();
        let (tx, rx) = mpsc::channel();
        drop(timer.schedule(
            Duration::from_secs(60),
            Box::new(move |status| tx.send(status).unwrap()),
        ));
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            TimerStatus::Cancelled
        );
    }

    #[test]
    fn test_handle_ids_are_unique() {
        let (a, _) = TimerHandle::pair();
        let (b, _) = TimerHandle::pair();
        assert_ne!(a.id(), b.id());
    }
}
