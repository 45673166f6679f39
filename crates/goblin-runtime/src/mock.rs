//! # Test Doubles
//!
//! [`MockTimer`] stands in for [`TokioTimer`](crate::timer::TokioTimer) so the
//! delayed kill event can be driven step by step from a test, with no sleeps.
//!
//! ```ignore
//! let timer = Arc::new(MockTimer::new());
//! let service = ActorService::with_timer(&executor, config, timer.clone())?;
//! let goblin = Handle::new(&service);
//! goblin.be_born();                  // arms the kill timer
//! assert_eq!(timer.pending(), 1);
//! timer.fire_next();                 // goblin kills someone, timer re-armed
//! ```

use crate::timer::{Timer, TimerCallback, TimerHandle, TimerStatus};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Scheduled {
    after: Duration,
    token: CancellationToken,
    callback: TimerCallback,
}

/// A [`Timer`] whose callbacks only run when the test says so.
#[derive(Default)]
pub struct MockTimer {
    queue: Mutex<VecDeque<Scheduled>>,
    delays: Mutex<Vec<Duration>>,
}

impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduled callbacks that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .iter()
            .filter(|s| !s.token.is_cancelled())
            .count()
    }

    /// Every delay ever passed to `schedule`, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }

    /// Fires the oldest live callback with [`TimerStatus::Fired`].
    ///
    /// Cancelled callbacks in front of it are completed with
    /// [`TimerStatus::Cancelled`] on the way. Returns `false` if nothing was live.
    pub fn fire_next(&self) -> bool {
        loop {
            let Some(next) = self.queue.lock().pop_front() else {
                return false;
            };
            if next.token.is_cancelled() {
                (next.callback)(TimerStatus::Cancelled);
                continue;
            }
            (next.callback)(TimerStatus::Fired);
            return true;
        }
    }

    /// Fires everything currently live. Callbacks scheduled while firing wait
    /// for the next call.
    pub fn fire_all(&self) -> usize {
        let batch: Vec<_> = self.queue.lock().drain(..).collect();
        let mut fired = 0;
        for scheduled in batch {
            if scheduled.token.is_cancelled() {
                (scheduled.callback)(TimerStatus::Cancelled);
            } else {
                (scheduled.callback)(TimerStatus::Fired);
                fired += 1;
            }
        }
        fired
    }
}

impl Timer for MockTimer {
    fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle {
        let (handle, token) = TimerHandle::pair();
        self.delays.lock().push(after);
        self.queue.lock().push_back(Scheduled {
            after,
            token,
            callback,
        });
        handle
    }
}

impl std::fmt::Debug for MockTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.queue.lock();
        f.debug_struct("MockTimer")
            .field("scheduled", &queue.iter().map(|s| s.after).collect::<Vec<_>>())
            .finish()
    }
}
