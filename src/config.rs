//! Runtime configuration loaded from environment variables.
//!
//! - `AGENTBOARD_DB_PATH` - SQLite file (default: platform data dir)
//! - `AGENTBOARD_POLL_SECS` - worker poll interval (default: 15)
//! - `AGENTBOARD_START_DELAY_SECS` - delay before the first tick (default: 5)
//! - `AGENTBOARD_MODEL` - model used by the worker
//! - `ANTHROPIC_BASE_URL` - Messages API base URL
//! - `TELEGRAM_API_URL` - Bot API base URL

use std::path::PathBuf;
use std::time::Duration;

use crate::ai::{DEFAULT_ANTHROPIC_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::notify::DEFAULT_TELEGRAM_API_URL;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `None` uses the platform data directory.
    pub db_path: Option<PathBuf>,
    pub schedule: WorkerSchedule,
    pub anthropic: AnthropicConfig,
    pub telegram_api_url: String,
}

/// When the autonomous worker runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSchedule {
    pub start_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for WorkerSchedule {
    fn default() -> Self {
        Self {
            start_delay: DEFAULT_START_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Client settings for the AI collaborator. Credentials are per project
/// and never come from the environment.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable numbers fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str, default: Duration| {
            non_empty(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            port: DEFAULT_PORT,
            db_path: non_empty("AGENTBOARD_DB_PATH").map(PathBuf::from),
            schedule: WorkerSchedule {
                start_delay: secs("AGENTBOARD_START_DELAY_SECS", DEFAULT_START_DELAY),
                poll_interval: secs("AGENTBOARD_POLL_SECS", DEFAULT_POLL_INTERVAL),
            },
            anthropic: AnthropicConfig {
                base_url: non_empty("ANTHROPIC_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_ANTHROPIC_URL.to_string()),
                model: non_empty("AGENTBOARD_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_tokens: DEFAULT_MAX_TOKENS,
            },
            telegram_api_url: non_empty("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_worker_cadence() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.schedule.poll_interval, Duration::from_secs(15));
        assert_eq!(config.schedule.start_delay, Duration::from_secs(5));
        assert_eq!(config.anthropic.model, DEFAULT_MODEL);
        assert_eq!(config.anthropic.max_tokens, 2048);
        assert!(config.db_path.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("AGENTBOARD_POLL_SECS", "60"),
            ("AGENTBOARD_START_DELAY_SECS", "0"),
            ("AGENTBOARD_DB_PATH", "/tmp/board.db"),
            ("AGENTBOARD_MODEL", "claude-test"),
            ("TELEGRAM_API_URL", "http://localhost:9999"),
        ]);
        assert_eq!(config.schedule.poll_interval, Duration::from_secs(60));
        assert_eq!(config.schedule.start_delay, Duration::ZERO);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/board.db")));
        assert_eq!(config.anthropic.model, "claude-test");
        assert_eq!(config.telegram_api_url, "http://localhost:9999");
    }

    #[test]
    fn ignores_blank_and_malformed_values() {
        let config = config(&[("AGENTBOARD_POLL_SECS", "soon"), ("AGENTBOARD_MODEL", "  ")]);
        assert_eq!(config.schedule.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.anthropic.model, DEFAULT_MODEL);
    }
}
