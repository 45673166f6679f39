//! # System Lifecycle & Orchestration
//!
//! Wires the pieces of a goblin application together: a primary executor, the
//! pool that drives it, and an [`ActorService`](goblin_runtime::ActorService)
//! delivering every notification onto that executor.
//!
//! ## The GoblinSystem Pattern
//!
//! ```rust,ignore
//! let mut system = GoblinSystem::new(RuntimeConfig::from_env()?)?;
//!
//! // 1. Create and spawn goblins
//! let mut goblins = system.spawn_goblins(3);
//!
//! // 2. Schedule their end and listen for it
//! let _order = system.die_all_after(&goblins, Duration::from_secs(1));
//! system.watch_deaths(&goblins);
//!
//! // 3. Drop one early: its death waiter is aborted
//! goblins.remove(2);
//!
//! // 4. Run until every notification has been delivered
//! system.run_to_completion();
//! ```
//!
//! ## Running to completion
//!
//! The primary pool has no threads of its own. [`GoblinSystem::run_to_completion`]
//! drains the executor on the calling thread and returns once there is no
//! outstanding work left: no queued handlers, no pending notifications, no
//! scheduled orders. Each pending notification holds a keep-alive on the executor,
//! so the run cannot end while anything is still owed to a client.
//!
//! ## Shutdown
//!
//! [`GoblinSystem::shutdown`] stops the primary pool and the service's worker
//! executor. Goblins whose handles are still alive afterwards keep their state but
//! no longer receive timer events.

pub mod goblin_system;

pub use goblin_system::*;
