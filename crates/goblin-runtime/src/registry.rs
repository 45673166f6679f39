//! Process-wide index of constructed goblins.
//!
//! Holds weak references only, keyed by [`InstanceId`]. Entries are never
//! removed; once a goblin is destroyed its entry simply stops resolving.

use crate::instance::{Instance, InstanceId};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tracing::trace;

#[derive(Default)]
pub(crate) struct Registry {
    entries: Mutex<BTreeMap<InstanceId, Weak<Instance>>>,
}

impl Registry {
    /// Records `instance`. Returns `false` if its id was already present.
    pub fn insert(&self, instance: &Arc<Instance>) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(&instance.id()) {
            return false;
        }
        entries.insert(instance.id(), Arc::downgrade(instance));
        trace!(id = %instance.id(), entries = entries.len(), "Registered");
        true
    }

    /// Goblins that are still alive in memory, in construction order.
    pub fn live(&self) -> Vec<Arc<Instance>> {
        self.entries
            .lock()
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Number of entries, resolvable or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
