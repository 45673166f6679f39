//! # Actor Service
//!
//! The factory and operation surface for goblins, bound to one *primary*
//! [`ExecutorContext`] supplied by the caller.
//!
//! - **Construction** generates a name, builds the [`Instance`] on the service's
//!   own worker executor, wraps it in its controlling proxy, registers it (weakly)
//!   and finally starts it outside the registry lock.
//! - **Notifications** requested through the service are delivered on the primary
//!   executor. Whoever drives that executor sees every handler run there, never on
//!   the worker or timer threads.
//!
//! Clients normally go through [`Handle`](crate::Handle) and
//! [`ActorRef`](crate::ActorRef) rather than calling the service directly.

use crate::config::RuntimeConfig;
use crate::dispatch::completion;
use crate::error::{Outcome, RuntimeError};
use crate::executor::{ExecutorContext, WorkerThreadService};
use crate::handle::ActorRef;
use crate::instance::Instance;
use crate::lifecycle::Event;
use crate::names::CyclicNames;
use crate::proxy::Proxy;
use crate::registry::Registry;
use crate::timer::{Timer, TokioTimer};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Name of the worker executor and of its pool threads.
const WORKER_NAME: &str = "goblin-worker";

struct ServiceInner {
    executor: ExecutorContext,
    worker: WorkerThreadService,
    registry: Registry,
    names: Mutex<CyclicNames>,
    timer: Arc<dyn Timer>,
    config: RuntimeConfig,
}

/// Cheaply cloneable; every clone is the same service.
#[derive(Clone)]
pub struct ActorService {
    inner: Arc<ServiceInner>,
}

impl ActorService {
    /// Creates a service delivering notifications on `executor`, with kill timers
    /// on a private Tokio runtime.
    pub fn new(executor: &ExecutorContext, config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let timer = Arc::new(TokioTimer::new()?);
        Self::with_timer(executor, config, timer)
    }

    pub fn with_timer(
        executor: &ExecutorContext,
        config: RuntimeConfig,
        timer: Arc<dyn Timer>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let worker = WorkerThreadService::start(WORKER_NAME, config.worker_threads)?;
        info!(
            executor = executor.name(),
            worker_threads = config.worker_threads,
            kill_interval = ?config.kill_interval(),
            "Actor service started"
        );
        Ok(Self {
            inner: Arc::new(ServiceInner {
                executor: executor.clone(),
                worker,
                registry: Registry::default(),
                names: Mutex::new(CyclicNames::new(config.names.clone())),
                timer,
                config,
            }),
        })
    }

    /// The primary executor notifications are delivered on.
    pub fn executor(&self) -> &ExecutorContext {
        &self.inner.executor
    }

    /// The executor goblin instances live on.
    pub fn worker_executor(&self) -> &ExecutorContext {
        self.inner.worker.executor()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Goblins still alive in memory, in construction order.
    pub fn actors(&self) -> Vec<ActorRef> {
        self.inner
            .registry
            .live()
            .iter()
            .map(|instance| ActorRef::from_instance(self, instance))
            .collect()
    }

    /// Every goblin ever constructed by this service, destroyed ones included.
    pub fn registered(&self) -> usize {
        self.inner.registry.len()
    }

    /// Stops the worker executor. Kill timers firing afterwards are dropped.
    pub fn shutdown(&self) {
        self.inner.worker.shutdown();
        info!(registered = self.registered(), "Actor service shut down");
    }

    pub(crate) fn construct(&self) -> Arc<Proxy> {
        let name = self.inner.names.lock().generate();
        let instance = Instance::new(
            name,
            self.worker_executor().clone(),
            self.inner.timer.clone(),
            self.inner.config.kill_interval(),
        );
        let proxy = Arc::new(Proxy::new(instance));
        self.inner.registry.insert(proxy.instance());
        debug!(goblin = proxy.instance().name(), id = %proxy.instance().id(), "Constructed");
        proxy.start();
        proxy
    }

    pub(crate) fn on_birth<H>(&self, instance: &Instance, handler: H)
    where
        H: FnOnce(Outcome) + Send + 'static,
    {
        let notify = completion(self.executor(), handler);
        instance.process_event(Event::RequestBirthNotification(notify));
    }

    pub(crate) fn wait_death<H>(&self, instance: &Instance, handler: H)
    where
        H: FnOnce(Outcome) + Send + 'static,
    {
        let notify = completion(self.executor(), handler);
        instance.process_event(Event::RequestDeathNotification(notify));
    }

    /// Registers a birth handler and triggers birth in one batch.
    pub(crate) fn spawn<H>(&self, instance: &Instance, handler: H)
    where
        H: FnOnce(Outcome) + Send + 'static,
    {
        let notify = completion(self.executor(), handler);
        instance.process_events([Event::RequestBirthNotification(notify), Event::Born]);
    }

    pub(crate) fn be_born(&self, instance: &Instance) {
        instance.process_event(Event::Born);
    }

    pub(crate) fn die(&self, instance: &Instance) {
        instance.process_event(Event::Dies);
    }
}

impl fmt::Debug for ActorService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorService")
            .field("executor", &self.inner.executor.name())
            .field("registered", &self.registered())
            .finish()
    }
}
