//! Dedicated worker executor that goblin instances are bound to.

use super::{ExecutorContext, WorkerPool};
use crate::error::RuntimeError;
use tracing::info;

/// A worker [`ExecutorContext`] together with the pool that drives it.
///
/// Timer follow-up events for every instance run here, off the primary context
/// that client handlers are delivered on.
pub struct WorkerThreadService {
    pool: WorkerPool,
}

impl WorkerThreadService {
    pub fn start(name: &str, threads: usize) -> Result<Self, RuntimeError> {
        let executor = ExecutorContext::new(name);
        let pool = WorkerPool::with_threads(executor, name, threads)?;
        info!(pool = name, threads, "Worker service started");
        Ok(Self { pool })
    }

    pub fn executor(&self) -> &ExecutorContext {
        self.pool.executor()
    }

    pub fn shutdown(&self) {
        self.pool.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_worker_executor_runs_posted_tasks_until_shutdown() {
        let service = WorkerThreadService::start("worker-test", 1).unwrap();
        let (tx, rx) = mpsc::channel();
        service.executor().post(move || tx.send(7).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);

        service.shutdown();
        assert!(service.executor().stopped());
    }
}
