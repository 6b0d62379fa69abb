//! Key-value backends.
//!
//! [`KeyValueBackend`] is the capability surface the cache layer needs from
//! a Redis-style store: string, hash and list primitives plus expiry. Every
//! failure is reported as [`cairn_core::CairnError::Backend`].

mod memory;
mod redis_backend;

pub use self::memory::InMemoryBackend;
pub use self::redis_backend::{create_pool, RedisBackend, RedisBackendParameters};

use async_trait::async_trait;
use cairn_config::{BackendKind, RedisConfig};
use cairn_core::{CairnResult, Interface};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Primitive operations of a remote key-value store.
///
/// `ttl` arguments of `None` store without expiration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueBackend: Interface + Send + Sync {
    /// Reads the text at `key`.
    async fn get(&self, key: &str) -> CairnResult<Option<String>>;

    /// Writes `value` at `key`, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CairnResult<()>;

    /// Writes `value` only if `key` is absent. Returns whether it was written.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> CairnResult<bool>;

    /// Removes `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> CairnResult<bool>;

    /// Checks whether `key` exists.
    async fn exists(&self, key: &str) -> CairnResult<bool>;

    /// Atomically adds `delta` to the integer at `key`, treating absent as 0.
    async fn increment(&self, key: &str, delta: i64) -> CairnResult<i64>;

    /// Re-arms the TTL of an existing key. Returns false if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> CairnResult<bool>;

    /// Reads `field` of the hash at `key`.
    async fn hash_get(&self, key: &str, field: &str) -> CairnResult<Option<String>>;

    /// Writes `field` of the hash at `key`.
    async fn hash_put(&self, key: &str, field: &str, value: &str) -> CairnResult<()>;

    /// Appends to the list at `key`. Returns the new length.
    async fn right_push(&self, key: &str, value: &str) -> CairnResult<i64>;

    /// Appends all values to the list at `key`. Returns the new length.
    async fn right_push_all(&self, key: &str, values: &[String]) -> CairnResult<i64>;

    /// Removes and returns the head of the list at `key`.
    async fn left_pop(&self, key: &str) -> CairnResult<Option<String>>;

    /// Returns list elements between `start` and `stop` inclusive.
    ///
    /// Negative indices count from the tail, `-1` being the last element.
    async fn range(&self, key: &str, start: i64, stop: i64) -> CairnResult<Vec<String>>;
}

/// Builds the backend selected by configuration.
///
/// A disabled backend still resolves: every call fails, and the resilient
/// accessor turns those failures into misses.
pub async fn create_backend(config: &RedisConfig) -> CairnResult<Arc<dyn KeyValueBackend>> {
    if !config.enabled {
        info!("Cache backend disabled");
        return Ok(Arc::new(RedisBackend::disabled()));
    }

    match config.backend {
        BackendKind::Memory => {
            info!("Using in-memory cache backend");
            Ok(Arc::new(InMemoryBackend::new()))
        }
        BackendKind::Redis => {
            let pool = create_pool(config).await?;
            Ok(Arc::new(RedisBackend::new(Arc::new(pool))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_disabled_backend() {
        let config = RedisConfig {
            enabled: false,
            ..RedisConfig::default()
        };
        let backend = create_backend(&config).await.unwrap();
        assert!(backend.get("k").await.is_err());
    }

    #[tokio::test]
    async fn test_create_memory_backend() {
        let config = RedisConfig {
            backend: BackendKind::Memory,
            ..RedisConfig::default()
        };
        let backend = create_backend(&config).await.unwrap();
        backend.set("k", "v", None).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some("v".to_string()));
    }
}
