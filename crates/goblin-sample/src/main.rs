//! # Goblins
//!
//! Three goblins are born, live for a second and are then told to die. The third
//! one's handle is dropped straight away, so it is deleted before it could even
//! die.
//!
//! ```bash
//! RUST_LOG=info cargo run -p goblin-sample
//! GOBLIN_KILL_INTERVAL_MS=200 RUST_LOG=info cargo run -p goblin-sample
//! ```

use goblin_runtime::tracing::setup_tracing;
use goblin_runtime::RuntimeConfig;
use goblin_sample::lifecycle::{GoblinSystem, SystemError};
use std::time::Duration;
use tracing::info;

fn main() -> Result<(), SystemError> {
    setup_tracing();

    let config = RuntimeConfig::from_env()?;
    info!(?config, "Starting goblin sample");

    let mut system = GoblinSystem::new(config)?;
    let mut goblins = system.spawn_goblins(3);

    let _order = system.die_all_after(&goblins, Duration::from_secs(1));
    system.watch_deaths(&goblins);

    goblins.remove(2);

    system.run_to_completion();

    for goblin in &goblins {
        info!(
            goblin = goblin.name(),
            state = %goblin.state(),
            kills = goblin.kills(),
            "Final tally"
        );
    }
    let reports = system.drain_reports();
    info!(reports = reports.len(), "Application completed");

    system.shutdown();
    Ok(())
}
