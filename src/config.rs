//! Runtime configuration read from the environment.
//!
//! Every value has a default so the dashboard core starts with an empty environment.
//! Values that fail to parse fall back to their default with a warning.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_WS_URL: &str = "ws://localhost:5000";
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_STORAGE_PATH: &str = "facepay_storage.json";
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Fixed delay between attempts, no backoff
    pub delay_ms: u64,
    /// Attempts after the first failure before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { delay_ms: DEFAULT_RECONNECT_DELAY_MS, max_attempts: DEFAULT_RECONNECT_ATTEMPTS }
    }
}

impl ReconnectPolicy {
    pub fn delay(&self) -> Duration { Duration::from_millis(self.delay_ms) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub ws_url: String,
    pub api_url: String,
    pub storage_path: PathBuf,
    pub session_ttl_hours: i64,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl Config {
    /// Build from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary variable lookup; used by `from_env` and by tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        if let Some(v) = lookup("FACEPAY_WS_URL").filter(|v| !v.trim().is_empty()) { cfg.ws_url = v.trim().to_string(); }
        if let Some(v) = lookup("FACEPAY_API_URL").filter(|v| !v.trim().is_empty()) {
            cfg.api_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("FACEPAY_STORAGE_PATH").filter(|v| !v.trim().is_empty()) { cfg.storage_path = PathBuf::from(v.trim()); }
        cfg.session_ttl_hours = parse_or("FACEPAY_SESSION_TTL_HOURS", lookup("FACEPAY_SESSION_TTL_HOURS"), DEFAULT_SESSION_TTL_HOURS);
        if cfg.session_ttl_hours <= 0 {
            warn!(target: "facepay::config", "FACEPAY_SESSION_TTL_HOURS must be positive, using {}", DEFAULT_SESSION_TTL_HOURS);
            cfg.session_ttl_hours = DEFAULT_SESSION_TTL_HOURS;
        }
        cfg.reconnect.delay_ms = parse_or("FACEPAY_RECONNECT_DELAY_MS", lookup("FACEPAY_RECONNECT_DELAY_MS"), DEFAULT_RECONNECT_DELAY_MS);
        cfg.reconnect.max_attempts = parse_or("FACEPAY_RECONNECT_ATTEMPTS", lookup("FACEPAY_RECONNECT_ATTEMPTS"), DEFAULT_RECONNECT_ATTEMPTS);
        cfg
    }

    pub fn session_ttl(&self) -> chrono::Duration { chrono::Duration::hours(self.session_ttl_hours) }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match raw {
        None => default,
        Some(s) => match s.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!(target: "facepay::config", "{}='{}' is not a valid number, using {}", name, s, default);
                default
            }
        },
    }
}
