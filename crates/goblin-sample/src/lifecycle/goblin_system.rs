use goblin_runtime::{
    ActorService, ExecutorContext, Handle, LifecycleError, RuntimeConfig, RuntimeError, Timer,
    TimerHandle, TimerStatus, TokioTimer, WorkerPool,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Name of the pool driving the primary executor.
pub const POOL_NAME: &str = "pool of life";

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

/// What the system observed about one goblin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Lives { name: String },
    NotAlive { name: String, error: LifecycleError },
    Died { name: String },
    DeletedBeforeDeath { name: String, error: LifecycleError },
}

/// Owns the primary executor, the pool that drives it and the goblin service.
pub struct GoblinSystem {
    executor: ExecutorContext,
    pool: WorkerPool,
    service: ActorService,
    clock: Arc<dyn Timer>,
    reports_tx: mpsc::UnboundedSender<Report>,
    reports_rx: mpsc::UnboundedReceiver<Report>,
}

impl GoblinSystem {
    pub fn new(config: RuntimeConfig) -> Result<Self, SystemError> {
        let clock: Arc<dyn Timer> = Arc::new(TokioTimer::new()?);
        Self::with_timer(config, clock)
    }

    /// Uses `clock` for both the goblins' kill timers and [`die_all_after`](Self::die_all_after).
    pub fn with_timer(config: RuntimeConfig, clock: Arc<dyn Timer>) -> Result<Self, SystemError> {
        let executor = ExecutorContext::new("primary");
        let pool = WorkerPool::new(executor.clone(), POOL_NAME);
        let service = ActorService::with_timer(&executor, config, clock.clone())?;
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        info!(pool = POOL_NAME, "Goblin system ready");

        Ok(Self {
            executor,
            pool,
            service,
            clock,
            reports_tx,
            reports_rx,
        })
    }

    pub fn service(&self) -> &ActorService {
        &self.service
    }

    pub fn executor(&self) -> &ExecutorContext {
        &self.executor
    }

    /// Constructs `count` goblins and spawns each of them.
    pub fn spawn_goblins(&self, count: usize) -> Vec<Handle> {
        (0..count)
            .map(|_| {
                let goblin = Handle::new(&self.service);
                let name = goblin.name().to_string();
                let reports = self.reports_tx.clone();
                goblin.spawn(move |outcome| {
                    let report = match outcome {
                        Ok(()) => {
                            info!(goblin = %name, thread = ?thread::current().id(), "Lives!");
                            Report::Lives { name }
                        }
                        Err(error) => {
                            warn!(goblin = %name, %error, "Not alive");
                            Report::NotAlive { name, error }
                        }
                    };
                    let _ = reports.send(report);
                });
                goblin
            })
            .collect()
    }

    /// Reports each goblin's death, or that it was deleted first.
    pub fn watch_deaths(&self, goblins: &[Handle]) {
        for goblin in goblins {
            let name = goblin.name().to_string();
            let reports = self.reports_tx.clone();
            goblin.wait_death(move |outcome| {
                let report = match outcome {
                    Ok(()) => {
                        info!(goblin = %name, "Died");
                        Report::Died { name }
                    }
                    Err(error) => {
                        warn!(goblin = %name, %error, "Deleted before it could even die");
                        Report::DeletedBeforeDeath { name, error }
                    }
                };
                let _ = reports.send(report);
            });
        }
    }

    /// Tells every goblin in `goblins` to die once `delay` has passed, without
    /// keeping any of them alive in the meantime.
    ///
    /// The primary executor is kept busy until then. Dropping the returned handle
    /// cancels the order.
    pub fn die_all_after(&self, goblins: &[Handle], delay: Duration) -> TimerHandle {
        let refs: Vec<_> = goblins.iter().map(Handle::to_ref).collect();
        let keep_alive = self.executor.keep_alive();
        self.clock.schedule(
            delay,
            Box::new(move |status| {
                if status == TimerStatus::Fired {
                    keep_alive.executor().post(move || {
                        info!(goblins = refs.len(), "Everybody dies");
                        for goblin in &refs {
                            goblin.die();
                        }
                    });
                }
                drop(keep_alive);
            }),
        )
    }

    /// Drives the primary executor on the calling thread until it runs out of work.
    pub fn run_to_completion(&self) {
        self.pool.join();
    }

    /// Reports received so far, in delivery order.
    pub fn drain_reports(&mut self) -> Vec<Report> {
        let mut reports = Vec::new();
        while let Ok(report) = self.reports_rx.try_recv() {
            reports.push(report);
        }
        reports
    }

    pub fn shutdown(&self) {
        self.pool.stop();
        self.service.shutdown();
        info!("Goblin system shut down");
    }
}
