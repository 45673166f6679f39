//! # Lifecycle State Machine
//!
//! ```text
//!   Unborn ──Born──► KillingFolk ──Dies──► Dead ─┐
//!     │                                    ▲  ▲  │ Dies (no-op)
//!     └───────────────Dies─────────────────┘  └──┘
//! ```
//!
//! [`LifecycleState::handle`] is pure bookkeeping: it moves handlers in and out
//! of the per-state lists and reports, as a [`Transition`], which notifications
//! are now due and whether the kill timer must be armed. It never calls a
//! handler and never touches an executor; the owning instance does that after
//! releasing its lock.
//!
//! Every `(state, event)` pair is matched explicitly, so adding a state or an
//! event does not compile until each combination is decided.

use super::Event;
use crate::dispatch::Notify;
use crate::error::{LifecycleError, Outcome};
use crate::timer::TimerHandle;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Unborn,
    KillingFolk,
    Dead,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateKind::Unborn => "Unborn",
            StateKind::KillingFolk => "KillingFolk",
            StateKind::Dead => "Dead",
        };
        f.write_str(name)
    }
}

/// The armed kill timer of a living goblin.
#[derive(Debug)]
pub(crate) struct Delayed {
    pub arm: u64,
    pub timer: TimerHandle,
}

/// A notification that became due, with the outcome it will receive.
pub(crate) struct Delivery {
    notify: Notify,
    outcome: Outcome,
}

impl Delivery {
    fn new(notify: Notify, outcome: Outcome) -> Self {
        Self { notify, outcome }
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn deliver(self) {
        (self.notify)(self.outcome)
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// What processing one event asks the owner to do.
#[derive(Default)]
pub(crate) struct Transition {
    pub deliveries: Vec<Delivery>,
    /// State entered by this event, if it changed state.
    pub entered: Option<StateKind>,
    /// Arm the kill timer for the (new) `KillingFolk` state.
    pub arm: bool,
    /// The kill timer elapsed in `KillingFolk`: somebody got killed.
    pub killed: bool,
    /// Birth waiters of a goblin that died unborn. They never fire, and are
    /// dropped by the owner once its lock is released.
    pub abandoned: Vec<Notify>,
    /// A timer event that lost the race with a newer arm or with `Dies`.
    pub stale: bool,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("deliveries", &self.deliveries)
            .field("entered", &self.entered)
            .field("arm", &self.arm)
            .field("killed", &self.killed)
            .field("abandoned", &self.abandoned.len())
            .field("stale", &self.stale)
            .finish()
    }
}

impl Transition {
    fn deliver_all(notifies: Vec<Notify>, outcome: Outcome) -> Vec<Delivery> {
        notifies
            .into_iter()
            .map(|notify| Delivery::new(notify, outcome.clone()))
            .collect()
    }

    fn single(notify: Notify, outcome: Outcome) -> Self {
        Self {
            deliveries: vec![Delivery::new(notify, outcome)],
            ..Self::default()
        }
    }

    fn stale() -> Self {
        Self {
            stale: true,
            ..Self::default()
        }
    }
}

pub(crate) enum LifecycleState {
    Unborn {
        birth: Vec<Notify>,
        death: Vec<Notify>,
    },
    KillingFolk {
        delayed: Option<Delayed>,
        death: Vec<Notify>,
    },
    Dead,
}

impl Default for LifecycleState {
    fn default() -> Self {
        LifecycleState::Unborn {
            birth: Vec::new(),
            death: Vec::new(),
        }
    }
}

impl LifecycleState {
    pub fn kind(&self) -> StateKind {
        match self {
            LifecycleState::Unborn { .. } => StateKind::Unborn,
            LifecycleState::KillingFolk { .. } => StateKind::KillingFolk,
            LifecycleState::Dead => StateKind::Dead,
        }
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, LifecycleState::Dead)
    }

    /// Number of birth and death handlers still waiting.
    pub fn waiting(&self) -> (usize, usize) {
        match self {
            LifecycleState::Unborn { birth, death } => (birth.len(), death.len()),
            LifecycleState::KillingFolk { death, .. } => (0, death.len()),
            LifecycleState::Dead => (0, 0),
        }
    }

    /// Sequence number of the currently armed kill timer.
    pub fn armed(&self) -> Option<u64> {
        match self {
            LifecycleState::KillingFolk {
                delayed: Some(delayed),
                ..
            } => Some(delayed.arm),
            _ => None,
        }
    }

    /// Stores a freshly armed timer. Outside `KillingFolk` it is cancelled at once.
    pub fn install(&mut self, next: Delayed) {
        match self {
            LifecycleState::KillingFolk { delayed, .. } => {
                if let Some(previous) = delayed.replace(next) {
                    previous.timer.cancel();
                }
            }
            _ => next.timer.cancel(),
        }
    }

    /// Processes one event. On `Err` the state is left exactly as it was.
    pub fn handle(&mut self, event: Event) -> Result<Transition, LifecycleError> {
        use LifecycleState::{Dead, KillingFolk, Unborn};

        let current = std::mem::replace(self, Dead);
        let (next, result) = match (current, event) {
            // --- Unborn ---
            (Unborn { mut birth, death }, Event::RequestBirthNotification(notify)) => {
                birth.push(notify);
                (Unborn { birth, death }, Ok(Transition::default()))
            }
            (Unborn { birth, mut death }, Event::RequestDeathNotification(notify)) => {
                death.push(notify);
                (Unborn { birth, death }, Ok(Transition::default()))
            }
            (Unborn { birth, death }, Event::Born) => {
                let transition = Transition {
                    deliveries: Transition::deliver_all(birth, Ok(())),
                    entered: Some(StateKind::KillingFolk),
                    arm: true,
                    ..Transition::default()
                };
                (
                    KillingFolk {
                        delayed: None,
                        death,
                    },
                    Ok(transition),
                )
            }
            (Unborn { birth, death }, Event::Dies) => {
                // Birth waiters will never be notified.
                let transition = Transition {
                    deliveries: Transition::deliver_all(death, Ok(())),
                    entered: Some(StateKind::Dead),
                    abandoned: birth,
                    ..Transition::default()
                };
                (Dead, Ok(transition))
            }
            (state @ Unborn { .. }, event @ Event::SomethingHappened { .. }) => {
                (state, Err(invalid(StateKind::Unborn, &event)))
            }

            // --- KillingFolk ---
            (state @ KillingFolk { .. }, Event::RequestBirthNotification(notify)) => {
                (state, Ok(Transition::single(notify, Ok(()))))
            }
            (KillingFolk { delayed, mut death }, Event::RequestDeathNotification(notify)) => {
                death.push(notify);
                (KillingFolk { delayed, death }, Ok(Transition::default()))
            }
            (KillingFolk { delayed, death }, Event::Dies) => {
                if let Some(delayed) = delayed {
                    delayed.timer.cancel();
                }
                let transition = Transition {
                    deliveries: Transition::deliver_all(death, Ok(())),
                    entered: Some(StateKind::Dead),
                    ..Transition::default()
                };
                (Dead, Ok(transition))
            }
            (KillingFolk { delayed, death }, Event::SomethingHappened { arm }) => {
                match delayed {
                    Some(current) if current.arm == arm => {
                        let transition = Transition {
                            killed: true,
                            arm: true,
                            ..Transition::default()
                        };
                        (
                            KillingFolk {
                                delayed: None,
                                death,
                            },
                            Ok(transition),
                        )
                    }
                    delayed => (KillingFolk { delayed, death }, Ok(Transition::stale())),
                }
            }
            (state @ KillingFolk { .. }, event @ Event::Born) => {
                (state, Err(invalid(StateKind::KillingFolk, &event)))
            }

            // --- Dead ---
            (Dead, Event::RequestBirthNotification(notify)) => (
                Dead,
                Ok(Transition::single(notify, Err(LifecycleError::ActuallyDead))),
            ),
            (Dead, Event::RequestDeathNotification(notify)) => {
                (Dead, Ok(Transition::single(notify, Ok(()))))
            }
            (Dead, Event::Dies) => (Dead, Ok(Transition::default())),
            (Dead, Event::SomethingHappened { .. }) => (Dead, Ok(Transition::stale())),
            (Dead, event @ Event::Born) => (Dead, Err(invalid(StateKind::Dead, &event))),
        };
        *self = next;
        result
    }

    /// Empties every waiting list with [`LifecycleError::Aborted`] and disarms
    /// the kill timer. The state kind itself is left unchanged.
    pub fn abort(&mut self) -> Vec<Delivery> {
        let aborted = || Err(LifecycleError::Aborted);
        match self {
            LifecycleState::Unborn { birth, death } => {
                let mut deliveries = Transition::deliver_all(std::mem::take(birth), aborted());
                deliveries.extend(Transition::deliver_all(std::mem::take(death), aborted()));
                deliveries
            }
            LifecycleState::KillingFolk { delayed, death } => {
                if let Some(delayed) = delayed.take() {
                    delayed.timer.cancel();
                }
                Transition::deliver_all(std::mem::take(death), aborted())
            }
            LifecycleState::Dead => Vec::new(),
        }
    }
}

fn invalid(state: StateKind, event: &Event) -> LifecycleError {
    LifecycleError::InvalidTransition {
        state,
        event: event.label(),
    }
}

impl fmt::Debug for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (birth, death) = self.waiting();
        f.debug_struct("LifecycleState")
            .field("kind", &self.kind())
            .field("birth_waiters", &birth)
            .field("death_waiters", &death)
            .field("armed", &self.armed())
            .finish()
    }
}
