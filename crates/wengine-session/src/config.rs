//! Top-level engine configuration: event-log backend
//! selection, Redis URL, and per-world-kind tunables, loadable from YAML
//! with environment-variable overrides.
//!
//! Built on the `config` crate's layered `File`/`Environment` sources:
//! YAML base, environment overrides on top.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use wengine_worlds::config::WorldTunables;

/// Which [`wengine_eventlog::EventLogStore`] backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLogBackend {
    /// In-process, lost on restart.
    Memory,
    /// Redis-compatible, durable across restarts (24h TTL per entry).
    Redis,
}

impl Default for EventLogBackend {
    fn default() -> Self {
        Self::Memory
    }
}

/// Top-level configuration for a running engine process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Which event-log backend to use.
    #[serde(default)]
    pub event_log_backend: EventLogBackend,
    /// Redis connection URL, consulted only when
    /// `event_log_backend = "redis"`.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Per-world-kind tunable overrides.
    #[serde(default)]
    pub tunables: WorldTunables,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_log_backend: EventLogBackend::default(),
            redis_url: default_redis_url(),
            tunables: WorldTunables::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file, with `WENGINE_`-prefixed
    /// environment variables (e.g. `WENGINE_REDIS_URL`) overriding any
    /// value present in the file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file can't be read or parsed, or if
    /// an environment override doesn't deserialize into its field's type.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("WENGINE").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parse configuration from a YAML string, with the same
    /// `WENGINE_`-prefixed environment overrides as [`Self::from_file`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `yaml` doesn't parse, or if an
    /// environment override doesn't deserialize into its field's type.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .add_source(config::Environment::with_prefix("WENGINE").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// Errors loading or parsing an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The `config` crate failed to read, merge, or deserialize a source.
    #[error("failed to load engine config: {0}")]
    Config(#[from] config::ConfigError),
}

fn default_redis_url() -> String {
    String::from("redis://localhost:6379")
}

#[cfg(test)]
mod tests {
    use super::{EngineConfig, EventLogBackend};

    #[test]
    fn default_config_uses_in_memory_backend() {
        let config = EngineConfig::default();
        assert_eq!(config.event_log_backend, EventLogBackend::Memory);
        assert_eq!(config.redis_url, "redis://localhost:6379");
    }

    #[test]
    fn parse_overrides_backend_and_a_tunable() {
        let yaml = r#"
event_log_backend: redis
redis_url: "redis://example:6379"
tunables:
  game:
    attack_damage: 30
"#;
        let config = EngineConfig::parse(yaml).expect("valid yaml");
        assert_eq!(config.event_log_backend, EventLogBackend::Redis);
        assert_eq!(config.redis_url, "redis://example:6379");
        assert_eq!(config.tunables.game.attack_damage, 30);
    }

    #[test]
    fn parse_empty_yaml_uses_defaults() {
        let config = EngineConfig::parse("").expect("empty yaml is valid");
        assert_eq!(config, EngineConfig::default());
    }
}
