//! # Runtime Configuration
//!
//! [`RuntimeConfig`] carries the few knobs the runtime has. It deserializes with
//! `serde` (every field optional, missing fields take their defaults) and can be
//! overlaid from the environment with [`RuntimeConfig::from_env`].
//!
//! | Variable                  | Field              | Notes                        |
//! |---------------------------|--------------------|------------------------------|
//! | `GOBLIN_WORKER_THREADS`   | `worker_threads`   | must be at least 1           |
//! | `GOBLIN_KILL_INTERVAL_MS` | `kill_interval_ms` | `off` disables the kill timer |

use crate::error::RuntimeError;
use serde::Deserialize;
use std::time::Duration;

/// Names handed out, in order, by the default name generator.
pub const DEFAULT_NAMES: [&str; 3] = ["yarr!", "gnurgghhh!", "fgumschak!"];

/// Default delay between killings once a goblin is born.
pub const DEFAULT_KILL_INTERVAL_MS: u64 = 5_000;

pub const ENV_WORKER_THREADS: &str = "GOBLIN_WORKER_THREADS";
pub const ENV_KILL_INTERVAL_MS: &str = "GOBLIN_KILL_INTERVAL_MS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Threads draining the worker executor that goblins live on.
    pub worker_threads: usize,
    /// Delay before a living goblin kills someone. `None` never arms the timer.
    pub kill_interval_ms: Option<u64>,
    /// Cycle of names for newly constructed goblins.
    pub names: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 1,
            kill_interval_ms: Some(DEFAULT_KILL_INTERVAL_MS),
            names: DEFAULT_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overlaid with `GOBLIN_*` environment variables.
    pub fn from_env() -> Result<Self, RuntimeError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Fails when `interval` does not fit in whole `u64` milliseconds.
    pub fn with_kill_interval(
        mut self,
        interval: Option<Duration>,
    ) -> Result<Self, RuntimeError> {
        self.kill_interval_ms = interval
            .map(|d| {
                u64::try_from(d.as_millis()).map_err(|_| {
                    RuntimeError::InvalidConfig(format!("kill interval {d:?} is out of range"))
                })
            })
            .transpose()?;
        Ok(self)
    }

    pub fn kill_interval(&self) -> Option<Duration> {
        self.kill_interval_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.worker_threads == 0 {
            return Err(RuntimeError::InvalidConfig(
                "worker_threads must be at least 1".into(),
            ));
        }
        if self.names.is_empty() {
            return Err(RuntimeError::InvalidConfig("names must not be empty".into()));
        }
        Ok(())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), RuntimeError> {
        if let Some(raw) = lookup(ENV_WORKER_THREADS) {
            self.worker_threads = raw.trim().parse().map_err(|_| {
                RuntimeError::InvalidConfig(format!("{ENV_WORKER_THREADS}={raw:?} is not a count"))
            })?;
        }
        if let Some(raw) = lookup(ENV_KILL_INTERVAL_MS) {
            let raw = raw.trim();
            self.kill_interval_ms = if raw.eq_ignore_ascii_case("off") {
                None
            } else {
                Some(raw.parse().map_err(|_| {
                    RuntimeError::InvalidConfig(format!(
                        "{ENV_KILL_INTERVAL_MS}={raw:?} is not a millisecond count"
                    ))
                })?)
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_name_three_goblins_and_kill_every_five_seconds() {
        let config = RuntimeConfig::default();
        assert_eq!(config.worker_threads, 1);
        assert_eq!(config.kill_interval(), Some(Duration::from_secs(5)));
        assert_eq!(config.names, vec!["yarr!", "gnurgghhh!", "fgumschak!"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_document_keeps_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{ "worker_threads": 3, "kill_interval_ms": null }"#).unwrap();
        assert_eq!(config.worker_threads, 3);
        assert_eq!(config.kill_interval(), None);
        assert_eq!(config.names.len(), 3);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RuntimeConfig::default();
        config
            .apply_overrides(overrides(&[
                (ENV_WORKER_THREADS, "4"),
                (ENV_KILL_INTERVAL_MS, "off"),
            ]))
            .unwrap();
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.kill_interval_ms, None);

        config
            .apply_overrides(overrides(&[(ENV_KILL_INTERVAL_MS, " 250 ")]))
            .unwrap();
        assert_eq!(config.kill_interval(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_bad_env_value_is_rejected() {
        let mut config = RuntimeConfig::default();
        let err = config
            .apply_overrides(overrides(&[(ENV_WORKER_THREADS, "many")]))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_empty_pool_and_names() {
        assert!(RuntimeConfig::default()
            .with_worker_threads(0)
            .validate()
            .is_err());

        let config = RuntimeConfig {
            names: Vec::new(),
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_kill_interval_builder_rejects_overflow() {
        let config = RuntimeConfig::default()
            .with_kill_interval(Some(Duration::from_millis(1500)))
            .unwrap();
        assert_eq!(config.kill_interval_ms, Some(1500));

        let err = RuntimeConfig::default()
            .with_kill_interval(Some(Duration::MAX))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }
}
