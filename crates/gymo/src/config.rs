use std::{env, time::Duration};

use gymo_core::catalog::DEFAULT_RETENTION_DAYS;

const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Upper bound for `RETENTION_DAYS` (about a century).
const MAX_RETENTION_DAYS: u64 = 36_500;

/// Upper bound for `SWEEP_INTERVAL_SECONDS` (one year).
const MAX_SWEEP_INTERVAL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache TTL in seconds (default: 300)
    pub cache_ttl_seconds: u64,
    /// Maximum number of cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Path to SQLite database file (default: "gymo.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    #[allow(dead_code)]
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    #[allow(dead_code)]
    pub redis_url: String,
    /// Days a soft-deleted row is kept before it is purged (default: 30)
    pub retention_days: i64,
    /// Seconds between retention sweeps (default: one week)
    pub sweep_interval_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `SQLITE_PATH` - SQLite database path (default: "gymo.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    /// - `RETENTION_DAYS` - Retention window in days (default: 30)
    /// - `SWEEP_INTERVAL_SECONDS` - Sweep period in seconds (default: 604,800)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    ///
    /// Unparseable and zero sizes fall back to the defaults, as do windows
    /// above their upper bound.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |name: &str| lookup(name).and_then(|v| v.parse::<u64>().ok()).filter(|v| *v > 0);
        let bounded = |name: &str, max: u64| {
            parsed(name).filter(|v| {
                if *v > max {
                    tracing::warn!(
                        variable = name,
                        value = *v,
                        max,
                        "Value out of range, using default"
                    );
                }
                *v <= max
            })
        };

        Self {
            cache_ttl_seconds: parsed("CACHE_TTL_SECONDS").unwrap_or(300),
            cache_max_entries: parsed("CACHE_MAX_ENTRIES")
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(10_000),
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| "gymo.db".to_string()),
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),
            retention_days: bounded("RETENTION_DAYS", MAX_RETENTION_DAYS)
                .and_then(|v| i64::try_from(v).ok())
                .unwrap_or(DEFAULT_RETENTION_DAYS),
            sweep_interval_seconds: bounded("SWEEP_INTERVAL_SECONDS", MAX_SWEEP_INTERVAL_SECONDS)
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECONDS),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Get the retention window.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::try_days(self.retention_days)
            .unwrap_or_else(|| chrono::Duration::days(DEFAULT_RETENTION_DAYS))
    }

    /// Get the sweep period as a Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
