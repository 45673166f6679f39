//! # Worker Pool
//!
//! Threads that drive one [`ExecutorContext`] until it is explicitly stopped.
//!
//! - A pool thread holds a [`KeepAlive`](super::KeepAlive) for its whole life, so
//!   its context never finishes for lack of work while the pool is up.
//! - A panic escaping a task is caught here, logged, and the thread goes back to
//!   draining the queue. One bad task never takes a worker down.
//! - [`WorkerPool::stop`] stops the context, joins the threads and discards
//!   whatever was still queued.

use super::ExecutorContext;
use crate::error::RuntimeError;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

pub struct WorkerPool {
    name: String,
    executor: ExecutorContext,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(executor: ExecutorContext, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executor,
            threads: Mutex::new(Vec::new()),
        }
    }

    /// Builds a pool and starts `threads` workers on it.
    pub fn with_threads(
        executor: ExecutorContext,
        name: impl Into<String>,
        threads: usize,
    ) -> Result<Self, RuntimeError> {
        let pool = Self::new(executor, name);
        for _ in 0..threads {
            pool.add_thread()?;
        }
        Ok(pool)
    }

    pub fn executor(&self) -> &ExecutorContext {
        &self.executor
    }

    pub fn thread_count(&self) -> usize {
        self.threads.lock().len()
    }

    pub fn add_thread(&self) -> Result<(), RuntimeError> {
        let mut threads = self.threads.lock();
        let thread_name = format!("{}-{}", self.name, threads.len());
        let keep_alive = self.executor.keep_alive();
        let executor = self.executor.clone();
        let pool = self.name.clone();

        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                let _keep_alive = keep_alive;
                drive(&executor, &pool);
            })
            .map_err(RuntimeError::ThreadSpawn)?;

        threads.push(handle);
        debug!(pool = %self.name, threads = threads.len(), "Worker thread added");
        Ok(())
    }

    /// Stops the context, joins every worker and discards undelivered tasks.
    pub fn stop(&self) {
        self.executor.stop();
        self.join_threads();
        self.executor.discard_pending();
    }

    /// Drains the context on the calling thread as well, until the context is
    /// stopped, then joins the workers.
    ///
    /// Workers hold keep-alives, so with workers present this only returns after
    /// someone calls [`ExecutorContext::stop`].
    pub fn join(&self) {
        drive(&self.executor, &self.name);
        self.join_threads();
    }

    fn join_threads(&self) {
        let threads = std::mem::take(&mut *self.threads.lock());
        let current = thread::current().id();
        for handle in threads {
            // A pool torn down from one of its own tasks must not join itself.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!(pool = %self.name, "Worker thread terminated abnormally");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
        info!(pool = %self.name, "Worker pool stopped");
    }
}

fn drive(executor: &ExecutorContext, pool: &str) {
    while !executor.stopped() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| executor.run())) {
            error!(pool, panic = %panic_message(payload.as_ref()), "Task panicked; worker continues");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
