// src/config/app.rs
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::ingest::providers::http::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

pub const DEFAULT_ITEMS_PATH: &str = "items.json";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_COLLECT_INTERVAL_SECS: u64 = 900;
pub const DEFAULT_TEAM_TITLE: &str = "South Carolina Gamecocks — Football Feed";

/// Runtime settings, all from the environment (`.env` is loaded first by the binary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Snapshot file; `ITEMS_PATH`.
    pub items_path: PathBuf,
    /// Guards `POST /collect` when set; `COLLECT_TOKEN`.
    pub collect_token: Option<String>,
    /// `COLLECT_INTERVAL_SECS`; 0 turns the background loop off.
    pub collect_interval_secs: u64,
    /// `FETCH_TIMEOUT_SECS`
    pub fetch_timeout: Duration,
    /// `FETCH_USER_AGENT`
    pub user_agent: String,
    /// Directory served under `/static` (fight song audio); `STATIC_DIR`.
    pub static_dir: PathBuf,
    /// `TEAM_TITLE`
    pub team_title: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            items_path: PathBuf::from(DEFAULT_ITEMS_PATH),
            collect_token: None,
            collect_interval_secs: DEFAULT_COLLECT_INTERVAL_SECS,
            fetch_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            team_title: DEFAULT_TEAM_TITLE.to_string(),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_u64(key: &str) -> Option<u64> {
    non_empty(key).and_then(|v| v.parse().ok())
}

impl AppConfig {
    /// Unset or unparsable variables fall back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            items_path: non_empty("ITEMS_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.items_path),
            collect_token: non_empty("COLLECT_TOKEN"),
            collect_interval_secs: parse_u64("COLLECT_INTERVAL_SECS")
                .unwrap_or(d.collect_interval_secs),
            fetch_timeout: parse_u64("FETCH_TIMEOUT_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(d.fetch_timeout),
            user_agent: non_empty("FETCH_USER_AGENT").unwrap_or(d.user_agent),
            static_dir: non_empty("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.static_dir),
            team_title: non_empty("TEAM_TITLE").unwrap_or(d.team_title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 7] = [
        "ITEMS_PATH",
        "COLLECT_TOKEN",
        "COLLECT_INTERVAL_SECS",
        "FETCH_TIMEOUT_SECS",
        "FETCH_USER_AGENT",
        "STATIC_DIR",
        "TEAM_TITLE",
    ];

    fn clear() {
        for k in KEYS {
            env::remove_var(k);
        }
    }

    #[serial_test::serial]
    #[test]
    fn defaults_when_unset() {
        clear();
        assert_eq!(AppConfig::from_env(), AppConfig::default());
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_and_garbage_is_ignored() {
        clear();
        env::set_var("ITEMS_PATH", "/tmp/feed/items.json");
        env::set_var("COLLECT_TOKEN", "  s3cret ");
        env::set_var("COLLECT_INTERVAL_SECS", "0");
        env::set_var("FETCH_TIMEOUT_SECS", "soon");
        let c = AppConfig::from_env();
        assert_eq!(c.items_path, PathBuf::from("/tmp/feed/items.json"));
        assert_eq!(c.collect_token.as_deref(), Some("s3cret"));
        assert_eq!(c.collect_interval_secs, 0);
        assert_eq!(c.fetch_timeout, Duration::from_secs(20));
        clear();
    }

    #[serial_test::serial]
    #[test]
    fn blank_token_means_unguarded() {
        clear();
        env::set_var("COLLECT_TOKEN", "   ");
        assert_eq!(AppConfig::from_env().collect_token, None);
        clear();
    }
}
