//! # Goblin Instance
//!
//! The implementation object behind every handle: identity, name, the lifecycle
//! state machine and the kill timer, all behind one lock.
//!
//! ## Event processing
//!
//! [`Instance::process_events`] feeds a batch of events through the state
//! machine while holding the lock, collecting the notifications that became due.
//! They are delivered only after the lock is released, and each delivery posts
//! onto an executor anyway, so a handler that calls back into the same goblin
//! can never deadlock.
//!
//! ## Kill timer
//!
//! Entering `KillingFolk` arms the [`Timer`] with a sequence number. When it
//! fires, the callback hops onto the worker executor and injects
//! `SomethingHappened { arm }` through the same locked path as any other event,
//! holding only a weak reference, so a destroyed goblin is skipped. Leaving the
//! state cancels the timer, and an event carrying an outdated sequence number is
//! discarded.

use crate::dispatch::Notify;
use crate::executor::ExecutorContext;
use crate::lifecycle::{Delayed, Delivery, Event, LifecycleState, StateKind, Transition};
use crate::timer::{Timer, TimerStatus};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one constructed goblin. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn next() -> Self {
        InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Core {
    state: LifecycleState,
    stopped: bool,
    kills: u64,
    arm_seq: u64,
}

pub struct Instance {
    id: InstanceId,
    name: String,
    executor: ExecutorContext,
    timer: Arc<dyn Timer>,
    kill_interval: Option<Duration>,
    this: Weak<Instance>,
    core: Mutex<Core>,
}

impl Instance {
    pub(crate) fn new(
        name: String,
        executor: ExecutorContext,
        timer: Arc<dyn Timer>,
        kill_interval: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id: InstanceId::next(),
            name,
            executor,
            timer,
            kill_interval,
            this: this.clone(),
            core: Mutex::new(Core {
                state: LifecycleState::default(),
                stopped: false,
                kills: 0,
                arm_seq: 0,
            }),
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The worker executor this goblin's timer events run on.
    pub fn executor(&self) -> &ExecutorContext {
        &self.executor
    }

    pub fn state(&self) -> StateKind {
        self.core.lock().state.kind()
    }

    pub fn is_dead(&self) -> bool {
        self.core.lock().state.is_dead()
    }

    /// How many times the kill timer went off while this goblin was alive.
    pub fn kills(&self) -> u64 {
        self.core.lock().kills
    }

    pub(crate) fn start(&self) {
        info!(goblin = %self.name, id = %self.id, "Starting");
    }

    /// Orderly teardown: every handler still waiting is resolved with
    /// [`LifecycleError::Aborted`](crate::error::LifecycleError::Aborted) and
    /// the kill timer is disarmed.
    ///
    /// Later requests are aborted as well. Runs at most once.
    pub(crate) fn stop(&self) {
        let due = {
            let mut core = self.core.lock();
            if core.stopped {
                return;
            }
            core.stopped = true;
            core.state.abort()
        };
        info!(
            goblin = %self.name,
            id = %self.id,
            state = %self.state(),
            aborted = due.len(),
            "Stopping"
        );
        deliver(due);
    }

    pub(crate) fn process_event(&self, event: Event) {
        self.process_events([event]);
    }

    /// Applies `events` in order as one atomic batch.
    ///
    /// Handlers leave the lock before they are delivered or dropped: dropping
    /// one may release the last handle, which stops this same instance.
    pub(crate) fn process_events(&self, events: impl IntoIterator<Item = Event>) {
        let mut due = Vec::new();
        let mut abandoned = Vec::new();
        {
            let mut core = self.core.lock();
            for event in events {
                trace!(goblin = %self.name, id = %self.id, ?event, "Processing");
                let from = core.state.kind();
                match core.state.handle(event) {
                    Ok(transition) => {
                        self.apply(&mut core, transition, &mut due, &mut abandoned)
                    }
                    Err(e) => warn!(
                        goblin = %self.name,
                        id = %self.id,
                        state = %from,
                        error = %e,
                        "Event ignored"
                    ),
                }
            }
            if core.stopped {
                due.extend(core.state.abort());
            }
        }
        drop(abandoned);
        deliver(due);
    }

    fn apply(
        &self,
        core: &mut Core,
        transition: Transition,
        due: &mut Vec<Delivery>,
        abandoned: &mut Vec<Notify>,
    ) {
        if transition.stale {
            debug!(goblin = %self.name, id = %self.id, "Stale timer event discarded");
            return;
        }
        if let Some(entered) = transition.entered {
            info!(goblin = %self.name, id = %self.id, state = %entered, "Entered state");
        }
        if !transition.abandoned.is_empty() {
            debug!(
                goblin = %self.name,
                id = %self.id,
                abandoned = transition.abandoned.len(),
                "Birth waiters will never be notified"
            );
        }
        if transition.killed {
            core.kills += 1;
            info!(goblin = %self.name, id = %self.id, kills = core.kills, "Killed someone");
        }
        if transition.arm {
            self.arm(core);
        }
        abandoned.extend(transition.abandoned);
        due.extend(transition.deliveries);
    }

    fn arm(&self, core: &mut Core) {
        if core.stopped {
            return;
        }
        let Some(after) = self.kill_interval else {
            return;
        };
        core.arm_seq += 1;
        let arm = core.arm_seq;
        let this = self.this.clone();
        let executor = self.executor.clone();

        let timer = self.timer.schedule(
            after,
            Box::new(move |status| {
                if status == TimerStatus::Cancelled {
                    return;
                }
                executor.post(move || {
                    if let Some(instance) = this.upgrade() {
                        instance.process_event(Event::SomethingHappened { arm });
                    }
                });
            }),
        );
        debug!(goblin = %self.name, id = %self.id, arm, ?after, "Kill timer armed");
        core.state.install(Delayed { arm, timer });
    }
}

fn deliver(due: Vec<Delivery>) {
    for delivery in due {
        trace!(ok = delivery.outcome().is_ok(), "Delivering notification");
        delivery.deliver();
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.core.lock().state)
            .finish()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        debug!(goblin = %self.name, id = %self.id, "Destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LifecycleError, Outcome};
    use crate::mock::MockTimer;

    type Log = Arc<Mutex<Vec<Outcome>>>;

    fn notify(log: &Log) -> Notify {
        let log = log.clone();
        Box::new(move |outcome| log.lock().push(outcome))
    }

    fn instance(timer: &Arc<MockTimer>, interval: Option<Duration>) -> Arc<Instance> {
        Instance::new(
            "yarr!".into(),
            ExecutorContext::new("instance-test"),
            timer.clone(),
            interval,
        )
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = InstanceId::next();
        let b = InstanceId::next();
        assert!(b > a);
        assert_eq!(format!("{a}"), format!("#{}", a.as_u64()));
    }

    #[test]
    fn test_born_arms_timer_and_fire_counts_a_kill() {
        let timer = Arc::new(MockTimer::new());
        let goblin = instance(&timer, Some(Duration::from_secs(5)));
        goblin.process_event(Event::Born);

        assert_eq!(goblin.state(), StateKind::KillingFolk);
        assert_eq!(timer.pending(), 1);
        assert_eq!(timer.delays(), vec![Duration::from_secs(5)]);

        // The timer callback only posts; the worker executor runs the event.
        assert!(timer.fire_next());
        assert_eq!(goblin.kills(), 0);
        goblin.executor().run();
        assert_eq!(goblin.kills(), 1);
        assert_eq!(timer.pending(), 1, "re-armed after the kill");
    }

    #[test]
    fn test_no_interval_never_arms() {
        let timer = Arc::new(MockTimer::new());
        let goblin = instance(&timer, None);
        goblin.process_event(Event::Born);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn test_dies_disarms_and_late_fire_is_ignored() {
        let timer = Arc::new(MockTimer::new());
        let goblin = instance(&timer, Some(Duration::from_millis(1)));
        goblin.process_events([Event::Born, Event::Dies]);

        assert!(goblin.is_dead());
        assert_eq!(timer.pending(), 0);
        assert!(!timer.fire_next());
        goblin.executor().run();
        assert_eq!(goblin.kills(), 0);
    }

    #[test]
    fn test_batch_spawn_delivers_birth() {
        let timer = Arc::new(MockTimer::new());
        let goblin = instance(&timer, None);
        let log = Log::default();
        goblin.process_events([Event::RequestBirthNotification(notify(&log)), Event::Born]);
        assert_eq!(*log.lock(), vec![Ok(())]);
    }

    #[test]
    fn test_stop_aborts_pending_and_later_requests() {
        let timer = Arc::new(MockTimer::new());
        let goblin = instance(&timer, None);
        let log = Log::default();
        goblin.process_event(Event::RequestBirthNotification(notify(&log)));
        goblin.process_event(Event::RequestDeathNotification(notify(&log)));

        goblin.stop();
        goblin.stop();
        assert_eq!(
            *log.lock(),
            vec![Err(LifecycleError::Aborted), Err(LifecycleError::Aborted)]
        );

        goblin.process_event(Event::RequestDeathNotification(notify(&log)));
        assert_eq!(log.lock().len(), 3);
        assert_eq!(log.lock()[2], Err(LifecycleError::Aborted));
    }

    #[test]
    fn test_invalid_event_leaves_state() {
        let timer = Arc::new(MockTimer::new());
        let goblin = instance(&timer, None);
        goblin.process_event(Event::SomethingHappened { arm: 42 });
        assert_eq!(goblin.state(), StateKind::Unborn);
    }

    #[test]
    fn test_timer_event_after_destruction_is_skipped() {
        let timer = Arc::new(MockTimer::new());
        let goblin = instance(&timer, Some(Duration::from_secs(1)));
        let executor = goblin.executor().clone();
        goblin.process_event(Event::Born);
        drop(goblin);

        // Dropping the instance dropped its timer handle too.
        assert_eq!(timer.pending(), 0);
        assert!(!timer.fire_next());
        assert_eq!(executor.run(), 0);
    }
}
