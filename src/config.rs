//! Configuration file support.
//!
//! Loads configuration from `mansearch.toml` in the current directory or
//! `<config dir>/mansearch/config.toml`. Every field has a default, so an
//! absent or partial file is fine.

use crate::search::MatchOptions;
use crate::types::Field;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOCAL_CONFIG_FILE: &str = "mansearch.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub fuzzy: FuzzyConfig,
    pub search: SearchConfig,
}

/// Remote search endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the documentation site, e.g. `https://man.example.org`.
    /// Without it the client runs on the local tier only.
    pub base_url: Option<String>,
    pub timeout_ms: u64,
    /// Calls slower than this log a warning.
    pub slow_request_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 10_000,
            slow_request_ms: 1_000,
        }
    }
}

impl RemoteConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub const fn slow_request(&self) -> Duration {
        Duration::from_millis(self.slow_request_ms)
    }
}

/// Fetch cache sizing and lifetimes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_ms: u64,
    pub capacity: usize,
    /// In-flight requests older than this are ignored and re-issued.
    pub in_flight_stale_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 300_000,
            capacity: 500,
            in_flight_stale_ms: 5_000,
        }
    }
}

impl CacheConfig {
    pub const fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub const fn in_flight_stale(&self) -> Duration {
        Duration::from_millis(self.in_flight_stale_ms)
    }
}

/// Fuzzy engine tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    pub threshold: f64,
    pub min_match_char_length: usize,
    pub location_distance: usize,
    pub ignore_location: bool,
    /// Relative field weights; normalized to sum to 1 when the engine is built.
    pub weights: BTreeMap<Field, f64>,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            min_match_char_length: 2,
            location_distance: 100,
            ignore_location: false,
            weights: BTreeMap::from([
                (Field::Name, 0.4),
                (Field::Title, 0.3),
                (Field::Description, 0.2),
                (Field::Category, 0.1),
            ]),
        }
    }
}

impl FuzzyConfig {
    pub const fn match_options(&self) -> MatchOptions {
        MatchOptions {
            threshold: self.threshold,
            min_match_char_length: self.min_match_char_length,
            location_distance: self.location_distance,
            ignore_location: self.ignore_location,
        }
    }
}

/// What to do when the remote tier answers successfully with zero results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyRemotePolicy {
    /// Treat an empty remote answer like a failure and try the local engine.
    #[default]
    Fallback,
    /// Trust the remote: an empty answer is final.
    Accept,
}

/// Search client behaviour.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub empty_remote_policy: EmptyRemotePolicy,
    /// Prefixes shorter than this get no suggestions at all.
    pub min_suggestion_len: usize,
    /// Threshold for the name-only suggestion fallback.
    pub suggestion_threshold: f64,
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            empty_remote_policy: EmptyRemotePolicy::Fallback,
            min_suggestion_len: 2,
            suggestion_threshold: 0.4,
            default_limit: 10,
        }
    }
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. mansearch.toml in current directory
    /// 2. <config dir>/mansearch/config.toml
    /// 3. built-in defaults
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(Path::new(LOCAL_CONFIG_FILE)) {
            return config;
        }

        if let Some(path) = Self::user_config_path()
            && let Some(config) = Self::load_from_path(&path)
        {
            return config;
        }

        Self::default()
    }

    /// Path of the per-user config file, if the platform has a config dir.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mansearch").join("config.toml"))
    }

    /// Reads one config file. Missing files are silent; malformed ones warn.
    pub fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!("Loaded configuration from {}", path.display());
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    #[test]
    fn test_defaults() {
        let config = Config::default();
        check!(config.cache.ttl() == Duration::from_secs(300));
        check!(config.cache.in_flight_stale() == Duration::from_secs(5));
        check!(config.remote.slow_request() == Duration::from_secs(1));
        check!(config.fuzzy.weights[&Field::Name] == 0.4);
        check!(config.search.empty_remote_policy == EmptyRemotePolicy::Fallback);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [remote]
            base_url = "https://man.example.org"

            [fuzzy]
            threshold = 0.4

            [fuzzy.weights]
            name = 1.0
            keywords = 0.5

            [search]
            empty_remote_policy = "accept"
            "#,
        )
        .unwrap();

        check!(config.remote.base_url.as_deref() == Some("https://man.example.org"));
        check!(config.remote.timeout_ms == 10_000);
        check!(config.fuzzy.threshold == 0.4);
        check!(config.fuzzy.min_match_char_length == 2);
        check!(config.fuzzy.weights.len() == 2);
        check!(config.fuzzy.weights[&Field::Keywords] == 0.5);
        check!(config.search.empty_remote_policy == EmptyRemotePolicy::Accept);
        check!(config.cache == CacheConfig::default());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\nttl_ms = 1000\n").unwrap();
        let_assert!(Some(config) = Config::load_from_path(&path));
        check!(config.cache.ttl_ms == 1000);

        std::fs::write(&path, "[cache\n").unwrap();
        check!(Config::load_from_path(&path).is_none());
        check!(Config::load_from_path(&dir.path().join("missing.toml")).is_none());
    }
}
