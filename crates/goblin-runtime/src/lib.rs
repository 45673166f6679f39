//! # Goblin Runtime
//!
//! A runtime for short-lived **active objects** ("goblins") whose client-facing
//! handles and live implementations have independently managed lifetimes. Work
//! runs on executor contexts driven by worker pools; every lifecycle notification
//! is delivered asynchronously, at most once.
//!
//! ## Architecture Overview
//!
//! 1. **Execution Layer** ([`ExecutorContext`], [`WorkerPool`]) - FIFO task
//!    queues and the threads that drain them
//! 2. **Lifecycle Layer** ([`Instance`], [`StateKind`]) - the per-goblin state
//!    machine, its lock and its kill timer
//! 3. **Ownership Layer** ([`ActorService`], [`Handle`], [`ActorRef`]) -
//!    construction, registration and the owning / non-owning references
//!
//! ## Lifecycle
//!
//! ```text
//!   Unborn ──Born──► KillingFolk ──Dies──► Dead
//!     └──────────────────Dies──────────────▲
//! ```
//!
//! | Request        | Unborn   | KillingFolk          | Dead                    |
//! |----------------|----------|----------------------|-------------------------|
//! | birth waiter   | queued   | fires `Ok`           | fires `ActuallyDead`    |
//! | death waiter   | queued   | queued               | fires `Ok`              |
//!
//! Dropping the last [`Handle`] stops the goblin: any waiter still queued is
//! resolved with [`LifecycleError::Aborted`].
//!
//! ## Ownership
//!
//! ```text
//!   Handle ──strong──► Proxy ──strong──► Instance ◄──weak── Registry
//!                                           ▲
//!   ActorRef ─────────────weak──────────────┘
//! ```
//!
//! The proxy is the only strong owner of an instance. It starts the instance
//! once at construction and stops it once when the last handle releases it. The
//! registry and every [`ActorRef`] only ever hold weak references, so they never
//! extend a goblin's life.
//!
//! ## Threads
//!
//! - Handlers run on the service's *primary* executor, supplied by the caller.
//! - Goblin instances and their timer events live on the service's *worker*
//!   executor, drained by its own [`WorkerThreadService`].
//! - Kill timers run on a small Tokio runtime ([`TokioTimer`]), or on a
//!   [`MockTimer`](mock::MockTimer) in tests.
//!
//! ```rust,no_run
//! use goblin_runtime::{ActorService, ExecutorContext, Handle, RuntimeConfig, WorkerPool};
//!
//! # fn main() -> Result<(), goblin_runtime::RuntimeError> {
//! let primary = ExecutorContext::new("primary");
//! let pool = WorkerPool::with_threads(primary.clone(), "pool of life", 1)?;
//! let service = ActorService::new(&primary, RuntimeConfig::from_env()?)?;
//!
//! let goblin = Handle::spawned(&service, |outcome| println!("born: {outcome:?}"));
//! goblin.die();
//! goblin.wait_death(|outcome| println!("died: {outcome:?}"));
//! # drop(pool);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! [`mock::MockTimer`] replaces the kill timer with one fired explicitly by the
//! test. See the [`mock`] module.

pub mod client_trait;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod handle;
pub mod instance;
pub mod lifecycle;
pub mod mock;
pub mod names;
mod proxy;
mod registry;
pub mod service;
pub mod timer;
pub mod tracing;

// Re-export core types for convenience
pub use client_trait::LifecycleClient;
pub use config::RuntimeConfig;
pub use error::{LifecycleError, Outcome, RuntimeError};
pub use executor::{ExecutorContext, KeepAlive, WorkerPool, WorkerThreadService};
pub use handle::{ActorRef, Handle};
pub use instance::{Instance, InstanceId};
pub use lifecycle::StateKind;
pub use service::ActorService;
pub use timer::{Timer, TimerHandle, TimerStatus, TokioTimer};
