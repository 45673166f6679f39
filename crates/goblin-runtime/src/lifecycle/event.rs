//! Events accepted by the lifecycle state machine.

use crate::dispatch::Notify;
use std::fmt;

pub(crate) enum Event {
    Born,
    Dies,
    RequestBirthNotification(Notify),
    RequestDeathNotification(Notify),
    /// The kill timer armed under sequence number `arm` elapsed.
    SomethingHappened { arm: u64 },
}

impl Event {
    pub fn label(&self) -> &'static str {
        match self {
            Event::Born => "Born",
            Event::Dies => "Dies",
            Event::RequestBirthNotification(_) => "RequestBirthNotification",
            Event::RequestDeathNotification(_) => "RequestDeathNotification",
            Event::SomethingHappened { .. } => "SomethingHappened",
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::SomethingHappened { arm } => {
                f.debug_struct("SomethingHappened").field("arm", arm).finish()
            }
            other => f.write_str(other.label()),
        }
    }
}
