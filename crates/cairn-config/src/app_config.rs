//! Application configuration structures.

use cairn_core::telemetry::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Key-value backend configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Cache-aside defaults.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "cairn".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Which key-value store backs the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Redis through a connection pool.
    #[default]
    Redis,
    /// Process-local map, for development and tests.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redis => write!(f, "redis"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Enable the backend. When disabled every cache read is a miss.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Backend implementation.
    #[serde(default)]
    pub backend: BackendKind,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_enabled() -> bool {
    true
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
            enabled: default_enabled(),
            backend: BackendKind::default(),
        }
    }
}

/// Cache-aside defaults applied when callers build options from config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default entry TTL in seconds. Zero or negative disables expiry.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: i64,
    /// Whether empty sequences and mappings are cached by default.
    #[serde(default)]
    pub cache_empty: bool,
}

fn default_ttl_secs() -> i64 {
    600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            cache_empty: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_defaults() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.pool_size, 10);
        assert!(config.enabled);
        assert_eq!(config.backend, BackendKind::Redis);
    }

    #[test]
    fn test_cache_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl_secs, 600);
        assert!(!config.cache_empty);
    }

    #[test]
    fn test_backend_kind_deserialize() {
        let kind: BackendKind = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(kind, BackendKind::Memory);
        assert_eq!(kind.to_string(), "memory");
    }
}
