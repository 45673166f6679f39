//! # Executor Context
//!
//! A FIFO task queue plus the loop that drains it. Any number of threads may call
//! [`ExecutorContext::run`] on the same context; each task is executed by exactly
//! one of them.
//!
//! ## Outstanding work
//!
//! The context counts *outstanding work*: every queued task, plus every live
//! [`KeepAlive`] token. `run` returns, and marks the context stopped, as soon as
//! that count reaches zero. A keep-alive therefore stops an idle context from
//! being considered finished merely because its queue is momentarily empty.
//!
//! ## Stopping
//!
//! [`ExecutorContext::stop`] wakes every blocked `run` and makes it return. Tasks
//! still queued are not executed; [`ExecutorContext::post`] on a stopped context
//! drops the task (best-effort delivery).

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// A unit of work queued on a context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // Contexts currently being run on this thread, innermost last.
    static RUNNING: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

struct Inner {
    id: u64,
    name: String,
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    // Signalled on stop and when outstanding work drops to zero. Holds at most
    // one pending wake-up.
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    outstanding: AtomicUsize,
    stopped: AtomicBool,
}

impl Inner {
    fn wake(&self) {
        let _ = self.wake_tx.try_send(());
    }

    fn retire(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.wake();
        }
    }
}

/// Shared handle to a task queue. Cloning is cheap; all clones drive the same queue.
#[derive(Clone)]
pub struct ExecutorContext {
    inner: Arc<Inner>,
}

impl ExecutorContext {
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, receiver) = unbounded();
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            inner: Arc::new(Inner {
                id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                sender,
                receiver,
                wake_tx,
                wake_rx,
                outstanding: AtomicUsize::new(0),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Queues `task` for execution by a thread running this context.
    ///
    /// Never runs the task inline. Dropped if the context is stopped.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.stopped() {
            debug!(executor = %self.inner.name, "Post on stopped context; task dropped");
            return;
        }
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        if self.inner.sender.send(Box::new(task)).is_err() {
            // Both ends live in `inner`, so this cannot happen while `self` exists.
            self.inner.outstanding.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Runs `task` immediately when the calling thread is already running this
    /// context, otherwise behaves like [`post`](Self::post).
    pub fn dispatch<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.running_in_this_thread() {
            task();
        } else {
            self.post(task);
        }
    }

    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::AcqRel) {
            debug!(executor = %self.inner.name, "Context stopped");
            self.inner.wake();
        }
    }

    pub fn stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Clears the stopped flag so the context can be run again.
    pub fn restart(&self) {
        self.inner.stopped.store(false, Ordering::Release);
    }

    /// Returns a token that keeps [`run`](Self::run) from returning for lack of work.
    pub fn keep_alive(&self) -> KeepAlive {
        KeepAlive::new(self.inner.clone())
    }

    /// Amount of outstanding work: queued tasks plus live keep-alive tokens.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    pub fn running_in_this_thread(&self) -> bool {
        let id = self.inner.id;
        RUNNING.with(|running| running.borrow().contains(&id))
    }

    /// Executes queued tasks until the context is stopped or runs out of work.
    /// An idle `run` blocks until a task, a stop or the last unit of work retiring.
    ///
    /// Returns the number of tasks executed. A panic inside a task unwinds out of
    /// `run`; the outstanding-work count is kept consistent regardless.
    pub fn run(&self) -> usize {
        let _running = RunningGuard::enter(self.inner.id);
        let mut executed = 0;
        loop {
            if self.stopped() {
                break;
            }
            if self.outstanding() == 0 {
                trace!(executor = %self.inner.name, "Out of work");
                self.stop();
                break;
            }
            select! {
                recv(self.inner.receiver) -> task => match task {
                    Ok(task) => {
                        self.execute(task);
                        executed += 1;
                    }
                    Err(_) => break,
                },
                recv(self.inner.wake_rx) -> _ => {}
            }
        }
        // Pass the wake-up on to any other thread blocked in `run`.
        self.inner.wake();
        executed
    }

    /// Executes at most one ready task without blocking.
    pub fn poll_one(&self) -> bool {
        if self.stopped() {
            return false;
        }
        match self.inner.receiver.try_recv() {
            Ok(task) => {
                let _running = RunningGuard::enter(self.inner.id);
                self.execute(task);
                true
            }
            Err(_) => false,
        }
    }

    /// Drops every queued task without running it. Returns how many were dropped.
    pub fn discard_pending(&self) -> usize {
        let mut discarded = 0;
        while let Ok(task) = self.inner.receiver.try_recv() {
            let _work = WorkGuard(&self.inner);
            drop(task);
            discarded += 1;
        }
        if discarded > 0 {
            debug!(executor = %self.inner.name, discarded, "Discarded queued tasks");
        }
        discarded
    }

    fn execute(&self, task: Task) {
        let _work = WorkGuard(&self.inner);
        task();
    }
}

impl fmt::Debug for ExecutorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorContext")
            .field("name", &self.inner.name)
            .field("outstanding", &self.outstanding())
            .field("stopped", &self.stopped())
            .finish()
    }
}

/// Retires one unit of outstanding work when dropped, including on unwind.
struct WorkGuard<'a>(&'a Inner);

impl Drop for WorkGuard<'_> {
    fn drop(&mut self) {
        self.0.retire();
    }
}

/// Marks the current thread as running a context for the guard's lifetime.
struct RunningGuard {
    id: u64,
}

impl RunningGuard {
    fn enter(id: u64) -> Self {
        RUNNING.with(|running| running.borrow_mut().push(id));
        Self { id }
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        RUNNING.with(|running| {
            let mut running = running.borrow_mut();
            if let Some(pos) = running.iter().rposition(|id| *id == self.id) {
                running.remove(pos);
            }
        });
    }
}

/// Outstanding-work token; see the module docs.
pub struct KeepAlive {
    inner: Arc<Inner>,
}

impl KeepAlive {
    fn new(inner: Arc<Inner>) -> Self {
        inner.outstanding.fetch_add(1, Ordering::AcqRel);
        Self { inner }
    }

    pub fn executor(&self) -> ExecutorContext {
        ExecutorContext {
            inner: self.inner.clone(),
        }
    }
}

impl Clone for KeepAlive {
    fn clone(&self) -> Self {
        Self::new(self.inner.clone())
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.inner.retire();
    }
}

impl fmt::Debug for KeepAlive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeepAlive")
            .field("executor", &self.inner.name)
            .finish()
    }
}
