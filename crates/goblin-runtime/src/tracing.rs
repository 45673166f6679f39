//! # Observability & Tracing
//!
//! Every lifecycle milestone is a structured `tracing` event carrying the goblin's
//! name (`goblin`) and identity (`id`), so a single goblin can be followed across the
//! primary and worker executors.
//!
//! ```bash
//! # births, deaths, kills, start/stop
//! RUST_LOG=info cargo run -p goblin-sample
//!
//! # plus queue plumbing, timer arming and handler delivery
//! RUST_LOG=goblin_runtime=debug cargo run -p goblin-sample
//! ```
//!
//! With `RUST_LOG=info` a run of the sample looks like:
//!
//! ```text
//! INFO Starting goblin=yarr! id=#1
//! INFO Entered state goblin=yarr! id=#1 state=KillingFolk
//! INFO Born goblin=yarr! thread=ThreadId(1)
//! INFO Entered state goblin=yarr! id=#1 state=Dead
//! INFO Stopping goblin=fgumschak! id=#3 state=Dead aborted=0
//! ```

/// Installs the global `fmt` subscriber, filtered by `RUST_LOG`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
