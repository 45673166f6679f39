//! # Execution Substrate
//!
//! - [`ExecutorContext`]: a FIFO task queue with `post`/`dispatch`/`run`/`poll_one`
//!   and keep-alive accounting.
//! - [`WorkerPool`]: threads that drain one context until it is stopped.
//! - [`WorkerThreadService`]: the worker context goblins are bound to.

pub mod context;
pub mod pool;
pub mod worker;

pub use context::{ExecutorContext, KeepAlive, Task};
pub use pool::WorkerPool;
pub use worker::WorkerThreadService;
