//! # Runtime Errors
//!
//! Two error families live here:
//!
//! - [`LifecycleError`] travels through the notification channel. A waiter never
//!   sees it as a panic or an unwound stack, only as the `Err` side of the outcome
//!   its handler (or future) receives.
//! - [`RuntimeError`] is returned synchronously when the plumbing itself cannot be
//!   brought up (threads, timer runtime, configuration).

use crate::lifecycle::StateKind;

/// Outcome delivered to a birth or death waiter.
pub type Outcome = Result<(), LifecycleError>;

/// Errors surfaced by the lifecycle of a single goblin.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// A birth notification was requested after the goblin died.
    #[error("this goblin is actually dead")]
    ActuallyDead,

    /// The goblin was torn down (its last handle dropped) before the awaited
    /// transition happened.
    #[error("goblin was deleted before the transition could happen")]
    Aborted,

    /// The notification was dropped without ever being delivered, e.g. a birth
    /// waiter on a goblin that died unborn.
    #[error("notification abandoned; it will never fire")]
    Abandoned,

    /// An event arrived in a state that defines no transition for it.
    ///
    /// Only ever logged; callers that submitted the event are not told.
    #[error("no transition from {state} on {event}")]
    InvalidTransition {
        state: StateKind,
        event: &'static str,
    },
}

impl LifecycleError {
    /// Short stable label for structured log fields.
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleError::ActuallyDead => "actually_dead",
            LifecycleError::Aborted => "aborted",
            LifecycleError::Abandoned => "abandoned",
            LifecycleError::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

/// Errors raised while building the execution substrate.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("failed to start timer runtime: {0}")]
    TimerStartup(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actually_dead_message_matches_category_text() {
        assert_eq!(
            LifecycleError::ActuallyDead.to_string(),
            "this goblin is actually dead"
        );
    }

    #[test]
    fn test_invalid_transition_names_state_and_event() {
        let err = LifecycleError::InvalidTransition {
            state: StateKind::Dead,
            event: "Born",
        };
        assert_eq!(err.to_string(), "no transition from Dead on Born");
        assert_eq!(err.as_label(), "invalid_transition");
    }
}
