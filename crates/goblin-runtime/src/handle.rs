//! # Client Handles
//!
//! - [`Handle`] owns a goblin (through its controlling proxy). It can be moved
//!   but not cloned by client code; when the last handle goes away the goblin is
//!   stopped and destroyed.
//! - [`ActorRef`] is the non-owning counterpart. It can be cloned freely, keeps
//!   the goblin's id and name after the goblin is gone, and turns every
//!   operation into a no-op (or an `Aborted` notification) once it is.
//!
//! Equality is goblin identity, never name: names repeat across generator cycles.

use crate::client_trait::LifecycleClient;
use crate::error::{LifecycleError, Outcome};
use crate::instance::{Instance, InstanceId};
use crate::lifecycle::StateKind;
use crate::proxy::Proxy;
use crate::service::ActorService;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};
use tracing::debug;

pub struct Handle {
    service: ActorService,
    proxy: Arc<Proxy>,
}

impl Handle {
    /// Constructs a new, unborn goblin.
    pub fn new(service: &ActorService) -> Self {
        Self {
            service: service.clone(),
            proxy: service.construct(),
        }
    }

    /// Constructs a goblin and immediately spawns it; `handler` receives the
    /// birth outcome.
    pub fn spawned<H>(service: &ActorService, handler: H) -> Self
    where
        H: FnOnce(Outcome) + Send + 'static,
    {
        let handle = Self::new(service);
        handle.spawn(handler);
        handle
    }

    /// Shares ownership of the same goblin.
    #[cfg(test)]
    pub(crate) fn duplicate(&self) -> Self {
        Self {
            service: self.service.clone(),
            proxy: self.proxy.clone(),
        }
    }

    fn inner(&self) -> &Arc<Instance> {
        self.proxy.instance()
    }

    pub fn id(&self) -> InstanceId {
        self.inner().id()
    }

    pub fn name(&self) -> &str {
        self.inner().name()
    }

    pub fn state(&self) -> StateKind {
        self.inner().state()
    }

    pub fn is_dead(&self) -> bool {
        self.inner().is_dead()
    }

    pub fn kills(&self) -> u64 {
        self.inner().kills()
    }

    /// Calls `handler` once the goblin is born, with
    /// [`LifecycleError::ActuallyDead`] if it already died.
    pub fn on_birth<H>(&self, handler: H)
    where
        H: FnOnce(Outcome) + Send + 'static,
    {
        self.service.on_birth(self.inner(), handler);
    }

    /// Calls `handler` once the goblin is dead.
    pub fn wait_death<H>(&self, handler: H)
    where
        H: FnOnce(Outcome) + Send + 'static,
    {
        self.service.wait_death(self.inner(), handler);
    }

    /// Triggers birth and reports it to `handler`.
    pub fn spawn<H>(&self, handler: H)
    where
        H: FnOnce(Outcome) + Send + 'static,
    {
        self.service.spawn(self.inner(), handler);
    }

    pub fn be_born(&self) {
        self.service.be_born(self.inner());
    }

    pub fn die(&self) {
        self.service.die(self.inner());
    }

    pub fn to_ref(&self) -> ActorRef {
        ActorRef::from_instance(&self.service, self.inner())
    }
}

impl LifecycleClient for Handle {
    fn actor_ref(&self) -> ActorRef {
        self.to_ref()
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

/// Non-owning reference to a goblin.
#[derive(Clone)]
pub struct ActorRef {
    service: ActorService,
    id: InstanceId,
    name: Arc<str>,
    instance: Weak<Instance>,
}

impl ActorRef {
    pub(crate) fn from_instance(service: &ActorService, instance: &Arc<Instance>) -> Self {
        Self {
            service: service.clone(),
            id: instance.id(),
            name: Arc::from(instance.name()),
            instance: Arc::downgrade(instance),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the goblin still exists in memory (dead or not).
    pub fn is_alive(&self) -> bool {
        self.instance.strong_count() > 0
    }

    pub fn state(&self) -> Option<StateKind> {
        self.instance.upgrade().map(|instance| instance.state())
    }

    pub fn kills(&self) -> Option<u64> {
        self.instance.upgrade().map(|instance| instance.kills())
    }

    /// Like [`Handle::on_birth`]; a destroyed goblin answers `Aborted`.
    pub fn on_birth<H>(&self, handler: H)
    where
        H: FnOnce(Outcome) + Send + 'static,
    {
        match self.instance.upgrade() {
            Some(instance) => self.service.on_birth(&instance, handler),
            None => self.aborted(handler),
        }
    }

    /// Like [`Handle::wait_death`]; a destroyed goblin answers `Aborted`.
    pub fn wait_death<H>(&self, handler: H)
    where
        H: FnOnce(Outcome) + Send + 'static,
    {
        match self.instance.upgrade() {
            Some(instance) => self.service.wait_death(&instance, handler),
            None => self.aborted(handler),
        }
    }

    pub fn be_born(&self) {
        if let Some(instance) = self.instance.upgrade() {
            self.service.be_born(&instance);
        }
    }

    pub fn die(&self) {
        if let Some(instance) = self.instance.upgrade() {
            self.service.die(&instance);
        }
    }

    pub(crate) fn service(&self) -> &ActorService {
        &self.service
    }

    pub(crate) fn upgrade(&self) -> Option<Arc<Instance>> {
        self.instance.upgrade()
    }

    fn aborted<H>(&self, handler: H)
    where
        H: FnOnce(Outcome) + Send + 'static,
    {
        debug!(goblin = %self.name, id = %self.id, "Request on destroyed goblin");
        self.service
            .executor()
            .post(move || handler(Err(LifecycleError::Aborted)));
    }
}

impl LifecycleClient for ActorRef {
    fn actor_ref(&self) -> ActorRef {
        self.clone()
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActorRef {}

impl PartialEq<Handle> for ActorRef {
    fn eq(&self, other: &Handle) -> bool {
        self.id == other.id()
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}
