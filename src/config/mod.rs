//! Configuration management for the connectivity layer
//!
//! Configuration is read from `LIFELINE_*` environment variables with bundled
//! defaults. Invalid or absent values fall back to the defaults with a logged
//! warning; configuration loading is never fatal.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::endpoint::normalize_base;

/// Bundled primary API base, used when no valid override is configured
pub const DEFAULT_PRIMARY_BASE: &str = "https://api.caremesh.io";

/// Bundled fallback API base
pub const DEFAULT_FALLBACK_BASE: &str = "https://api-fallback.caremesh.io";

/// Third-party reachability probes used purely as an internet-connectivity
/// signal, independent of the target API
pub const DEFAULT_CONNECTIVITY_PROBES: [&str; 3] = [
    "https://www.gstatic.com/generate_204",
    "https://www.cloudflare.com/cdn-cgi/trace",
    "https://api.ipify.org",
];

/// Local proxy ping URL used in local/dev mode
pub const DEFAULT_LOCAL_PING_URL: &str = "http://127.0.0.1:8787/ping";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint and retry configuration
    pub connectivity: ConnectivityConfig,

    /// Resolution cache configuration
    pub cache: CacheConfig,

    /// Health prober configuration
    pub probe: ProbeConfig,
}

/// Endpoint and retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// Primary API base URL
    pub primary_base: String,

    /// Fallback API base URL
    pub fallback_base: String,

    /// Per-attempt timeout in milliseconds
    pub attempt_timeout_ms: u64,

    /// Number of full-catalog retry rounds after the first pass
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff between rounds
    pub retry_base_delay_ms: u64,
}

/// Resolution cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Path of the persisted cache snapshot
    pub snapshot_path: PathBuf,

    /// Entry TTL in milliseconds
    pub ttl_ms: u64,
}

/// Health prober configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Timeout for connectivity and local probes, in milliseconds
    pub probe_timeout_ms: u64,

    /// Timeout for direct API ping probes, in milliseconds
    pub api_timeout_ms: u64,

    /// Local/dev mode: probe only the local proxy
    pub local_mode: bool,

    /// Local proxy ping URL
    pub local_ping_url: String,

    /// Third-party reachability probe URLs
    pub connectivity_urls: Vec<String>,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            primary_base: DEFAULT_PRIMARY_BASE.to_string(),
            fallback_base: DEFAULT_FALLBACK_BASE.to_string(),
            attempt_timeout_ms: 5_000,
            max_retries: 2,
            retry_base_delay_ms: 1_000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("data/resolution-cache.json"),
            ttl_ms: crate::resolve::DEFAULT_TTL_MS,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 3_000,
            api_timeout_ms: 5_000,
            local_mode: false,
            local_ping_url: DEFAULT_LOCAL_PING_URL.to_string(),
            connectivity_urls: DEFAULT_CONNECTIVITY_PROBES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connectivity: ConnectivityConfig::default(),
            cache: CacheConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Absent or invalid values fall back to bundled defaults; a rejected
    /// base URL is logged.
    pub fn from_env() -> Self {
        let primary_base = base_from_env("LIFELINE_PRIMARY_URL", DEFAULT_PRIMARY_BASE);
        let fallback_base = base_from_env("LIFELINE_FALLBACK_URL", DEFAULT_FALLBACK_BASE);

        let attempt_timeout_ms = parse_env("LIFELINE_ATTEMPT_TIMEOUT_MS", 5_000);
        let max_retries = parse_env("LIFELINE_MAX_RETRIES", 2);
        let retry_base_delay_ms = parse_env("LIFELINE_RETRY_BASE_DELAY_MS", 1_000);

        let snapshot_path = std::env::var("LIFELINE_CACHE_PATH")
            .unwrap_or_else(|_| String::from("data/resolution-cache.json"))
            .into();
        let ttl_ms = parse_env("LIFELINE_CACHE_TTL_MS", crate::resolve::DEFAULT_TTL_MS);

        let probe_timeout_ms = parse_env("LIFELINE_PROBE_TIMEOUT_MS", 3_000);
        let api_timeout_ms = parse_env("LIFELINE_API_PROBE_TIMEOUT_MS", 5_000);
        let local_mode = std::env::var("LIFELINE_LOCAL_MODE")
            .ok()
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let local_ping_url = std::env::var("LIFELINE_LOCAL_PING_URL")
            .unwrap_or_else(|_| DEFAULT_LOCAL_PING_URL.to_string());

        Self {
            connectivity: ConnectivityConfig {
                primary_base,
                fallback_base,
                attempt_timeout_ms,
                max_retries,
                retry_base_delay_ms,
            },
            cache: CacheConfig {
                snapshot_path,
                ttl_ms,
            },
            probe: ProbeConfig {
                probe_timeout_ms,
                api_timeout_ms,
                local_mode,
                local_ping_url,
                connectivity_urls: DEFAULT_CONNECTIVITY_PROBES
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
        }
    }

    /// Per-attempt timeout as a [`Duration`]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.connectivity.attempt_timeout_ms)
    }
}

// Read a base URL from the environment, falling back to the bundled default
// when the value is absent or fails normalization.
fn base_from_env(var: &str, default: &str) -> String {
    match std::env::var(var) {
        Ok(raw) => match normalize_base(&raw) {
            Ok(_) => raw,
            Err(e) => {
                tracing::warn!(
                    var = %var,
                    value = %raw,
                    error = %e,
                    "Invalid base URL in environment, using bundled default"
                );
                default.to_string()
            }
        },
        Err(_) => default.to_string(),
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.connectivity.primary_base, DEFAULT_PRIMARY_BASE);
        assert_eq!(config.connectivity.fallback_base, DEFAULT_FALLBACK_BASE);
        assert_eq!(config.connectivity.attempt_timeout_ms, 5_000);
        assert_eq!(config.connectivity.max_retries, 2);
        assert_eq!(config.cache.ttl_ms, 5 * 60 * 1000);
        assert_eq!(config.probe.probe_timeout_ms, 3_000);
        assert!(!config.probe.local_mode);
        assert_eq!(config.probe.connectivity_urls.len(), 3);
    }

    #[test]
    fn test_invalid_base_falls_back_to_default() {
        assert_eq!(
            base_from_env("LIFELINE_TEST_UNSET_VAR", DEFAULT_PRIMARY_BASE),
            DEFAULT_PRIMARY_BASE
        );

        std::env::set_var("LIFELINE_TEST_BAD_URL", "definitely not a url");
        assert_eq!(
            base_from_env("LIFELINE_TEST_BAD_URL", DEFAULT_PRIMARY_BASE),
            DEFAULT_PRIMARY_BASE
        );
        std::env::remove_var("LIFELINE_TEST_BAD_URL");
    }

    #[test]
    fn test_parse_env_fallback() {
        assert_eq!(parse_env("LIFELINE_TEST_UNSET_NUM", 42u64), 42);

        std::env::set_var("LIFELINE_TEST_NOT_A_NUM", "abc");
        assert_eq!(parse_env("LIFELINE_TEST_NOT_A_NUM", 42u64), 42);
        std::env::remove_var("LIFELINE_TEST_NOT_A_NUM");
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let decoded: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(
            decoded.connectivity.primary_base,
            config.connectivity.primary_base
        );
    }
}
