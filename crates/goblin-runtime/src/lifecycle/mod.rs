//! Goblin lifecycle: `Unborn` → `KillingFolk` → `Dead`.

mod event;
mod state;

pub(crate) use event::Event;
pub use state::StateKind;
pub(crate) use state::{Delayed, Delivery, LifecycleState, Transition};
