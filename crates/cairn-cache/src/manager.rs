//! Direct primitive access to the cache.
//!
//! These operations skip the cache-aside protocol but keep its guarantees:
//! backend failures degrade to a benign default, and blank keys or values
//! never reach the backend.

use crate::backend::KeyValueBackend;
use crate::codec::is_blank;
use crate::options::Ttl;
use crate::resilient::ResilientAccessor;
use cairn_core::HasComponent;
use std::sync::Arc;

/// Cache facade over a shared key-value backend.
///
/// Holds nothing but the backend handle, so clones are cheap and any number
/// of tasks may use one concurrently. Concurrent misses on the same key each
/// run their supplier and the last write wins; callers that need a single
/// computation per key can build a lock on [`CacheManager::set_if_absent`].
#[derive(Clone)]
pub struct CacheManager {
    accessor: ResilientAccessor,
}

impl CacheManager {
    /// Create a manager over a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            accessor: ResilientAccessor::new(backend),
        }
    }

    /// Create a manager from the backend registered in a DI module.
    #[must_use]
    pub fn from_module<M: HasComponent<dyn KeyValueBackend>>(module: &M) -> Self {
        Self::new(module.resolve())
    }

    /// Get the text stored at `key`.
    pub async fn get(&self, key: &str) -> Option<String> {
        if is_blank(key) {
            return None;
        }
        self.accessor.get(key).await
    }

    /// Store `value` at `key` without expiration.
    pub async fn set(&self, key: &str, value: &str) {
        self.set_with_ttl(key, value, Ttl::NONE).await;
    }

    /// Store `value` at `key`. A non-positive TTL stores without expiration.
    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl: Ttl) {
        if is_blank(key) || is_blank(value) {
            return;
        }
        self.accessor.set(key, value, ttl.as_duration()).await;
    }

    /// Atomically store `value` only if `key` is absent.
    ///
    /// Returns true when this call created the key.
    pub async fn set_if_absent(&self, key: &str, value: &str, ttl: Ttl) -> bool {
        if is_blank(key) || is_blank(value) {
            return false;
        }
        self.accessor.set_if_absent(key, value, ttl.as_duration()).await
    }

    /// Remove `key`. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> bool {
        if is_blank(key) {
            return false;
        }
        self.accessor.delete(key).await
    }

    /// Check whether `key` exists.
    pub async fn exists(&self, key: &str) -> bool {
        if is_blank(key) {
            return false;
        }
        self.accessor.exists(key).await
    }

    /// Atomically add `delta` to the counter at `key`.
    ///
    /// Returns the new value, or 0 when the key is blank or the backend fails.
    pub async fn increment(&self, key: &str, delta: i64) -> i64 {
        if is_blank(key) {
            return 0;
        }
        self.accessor.increment(key, delta).await
    }

    /// Re-arm the TTL of an existing key.
    ///
    /// A non-positive TTL leaves the key untouched and returns false.
    pub async fn expire(&self, key: &str, ttl: Ttl) -> bool {
        if is_blank(key) {
            return false;
        }
        match ttl.as_duration() {
            Some(ttl) => self.accessor.expire(key, ttl).await,
            None => false,
        }
    }

    /// Get `field` of the hash at `key`.
    pub async fn get_hash(&self, key: &str, field: &str) -> Option<String> {
        if is_blank(key) || is_blank(field) {
            return None;
        }
        self.accessor.hash_get(key, field).await
    }

    /// Set `field` of the hash at `key`.
    pub async fn put_hash(&self, key: &str, field: &str, value: &str) {
        if is_blank(key) || is_blank(field) || is_blank(value) {
            return;
        }
        self.accessor.hash_put(key, field, value).await;
    }

    /// Append `value` to the list at `key`.
    pub async fn right_push(&self, key: &str, value: &str) {
        if is_blank(key) || is_blank(value) {
            return;
        }
        self.accessor.right_push(key, value).await;
    }

    /// Append every value to the list at `key`.
    pub async fn right_push_all(&self, key: &str, values: &[String]) {
        if is_blank(key) || values.is_empty() {
            return;
        }
        self.accessor.right_push_all(key, values).await;
    }

    /// Remove and return the head of the list at `key`.
    pub async fn left_pop(&self, key: &str) -> Option<String> {
        if is_blank(key) {
            return None;
        }
        self.accessor.left_pop(key).await
    }

    /// Elements of the list at `key` between `start` and `stop` inclusive.
    pub async fn range(&self, key: &str, start: i64, stop: i64) -> Vec<String> {
        if is_blank(key) {
            return Vec::new();
        }
        self.accessor.range(key, start, stop).await
    }
}
