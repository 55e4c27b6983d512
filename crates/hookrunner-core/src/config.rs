use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

// Canonical dispatcher defaults — see §4.5 of the subsystem spec.
pub const DEFAULT_CHANNEL_BUFFER: usize = 1000;
pub const DEFAULT_MAX_WORKERS: usize = 100;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_STUCK_THRESHOLD_SECS: i64 = 30;
pub const DEFAULT_CLEANUP_OLDER_THAN_SECS: i64 = 7 * 24 * 3600;
pub const DEFAULT_DB_PATH: &str = "hookrunner.db";

/// Top-level config (`hookrunner.toml` + `HOOKRUNNER_*` env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookRunnerConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

impl HookRunnerConfig {
    /// Load from an optional explicit path, falling back to
    /// `HOOKRUNNER_CONFIG` and then to built-in defaults merged with
    /// `HOOKRUNNER_*` environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self, Box<figment::Error>> {
        let path = path
            .map(str::to_string)
            .or_else(|| std::env::var("HOOKRUNNER_CONFIG").ok())
            .unwrap_or_else(|| "hookrunner.toml".to_string());

        Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("HOOKRUNNER_").split("__"))
            .extract()
            .map_err(Box::new)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Completed/failed events older than this are eligible for cleanup.
    #[serde(default = "default_cleanup_older_than")]
    pub cleanup_older_than_secs: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cleanup_older_than_secs: default_cleanup_older_than(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_stuck_threshold")]
    pub stuck_threshold_secs: i64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            channel_buffer: default_channel_buffer(),
            max_workers: default_max_workers(),
            poll_interval_secs: default_poll_interval(),
            stuck_threshold_secs: default_stuck_threshold(),
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}
fn default_cleanup_older_than() -> i64 {
    DEFAULT_CLEANUP_OLDER_THAN_SECS
}
fn default_channel_buffer() -> usize {
    DEFAULT_CHANNEL_BUFFER
}
fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}
fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_stuck_threshold() -> i64 {
    DEFAULT_STUCK_THRESHOLD_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_canonical_values() {
        let cfg = HookRunnerConfig::default();
        assert_eq!(cfg.dispatcher.channel_buffer, 1000);
        assert_eq!(cfg.dispatcher.max_workers, 100);
        assert_eq!(cfg.dispatcher.poll_interval_secs, 5);
        assert_eq!(cfg.dispatcher.stuck_threshold_secs, 30);
    }

    #[test]
    fn env_override_applies() {
        std::env::set_var("HOOKRUNNER_DISPATCHER__MAX_WORKERS", "4");
        let cfg: HookRunnerConfig = Figment::new()
            .merge(Toml::file("does-not-exist.toml"))
            .merge(Env::prefixed("HOOKRUNNER_").split("__"))
            .extract()
            .unwrap();
        assert_eq!(cfg.dispatcher.max_workers, 4);
        std::env::remove_var("HOOKRUNNER_DISPATCHER__MAX_WORKERS");
    }
}
