//! Failure boundary around the key-value backend.
//!
//! Every backend call goes through [`absorb`], which logs the error and
//! substitutes the primitive's "absent" result: `None` or empty for reads, `false` for
//! checks, `0` for counters, nothing for writes.

use crate::backend::KeyValueBackend;
use crate::metrics;
use cairn_core::CairnResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Awaits a backend call, replacing any error with `fallback`.
async fn absorb<T, Fut>(operation: &'static str, key: &str, fallback: T, call: Fut) -> T
where
    Fut: Future<Output = CairnResult<T>>,
{
    match call.await {
        Ok(value) => value,
        Err(e) => {
            warn!(operation, key, error = %e, "Cache backend error absorbed");
            metrics::record_backend_error(operation);
            fallback
        }
    }
}

/// Backend handle whose operations never fail.
#[derive(Clone)]
pub struct ResilientAccessor {
    backend: Arc<dyn KeyValueBackend>,
}

impl ResilientAccessor {
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        absorb("get", key, None, self.backend.get(key)).await
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        absorb("set", key, (), self.backend.set(key, value, ttl)).await;
    }

    pub async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        absorb("set_if_absent", key, false, self.backend.set_if_absent(key, value, ttl)).await
    }

    pub async fn delete(&self, key: &str) -> bool {
        absorb("delete", key, false, self.backend.delete(key)).await
    }

    pub async fn exists(&self, key: &str) -> bool {
        absorb("exists", key, false, self.backend.exists(key)).await
    }

    pub async fn increment(&self, key: &str, delta: i64) -> i64 {
        absorb("increment", key, 0, self.backend.increment(key, delta)).await
    }

    pub async fn expire(&self, key: &str, ttl: Duration) -> bool {
        absorb("expire", key, false, self.backend.expire(key, ttl)).await
    }

    pub async fn hash_get(&self, key: &str, field: &str) -> Option<String> {
        absorb("hash_get", key, None, self.backend.hash_get(key, field)).await
    }

    pub async fn hash_put(&self, key: &str, field: &str, value: &str) {
        absorb("hash_put", key, (), self.backend.hash_put(key, field, value)).await;
    }

    pub async fn right_push(&self, key: &str, value: &str) -> i64 {
        absorb("right_push", key, 0, self.backend.right_push(key, value)).await
    }

    pub async fn right_push_all(&self, key: &str, values: &[String]) -> i64 {
        absorb("right_push_all", key, 0, self.backend.right_push_all(key, values)).await
    }

    pub async fn left_pop(&self, key: &str) -> Option<String> {
        absorb("left_pop", key, None, self.backend.left_pop(key)).await
    }

    pub async fn range(&self, key: &str, start: i64, stop: i64) -> Vec<String> {
        absorb("range", key, Vec::new(), self.backend.range(key, start, stop)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockKeyValueBackend;
    use cairn_core::CairnError;

    fn down() -> CairnError {
        CairnError::backend("connection refused")
    }

    fn failing_backend() -> MockKeyValueBackend {
        let mut mock = MockKeyValueBackend::new();
        mock.expect_get().returning(|_| Err(down()));
        mock.expect_set().returning(|_, _, _| Err(down()));
        mock.expect_set_if_absent().returning(|_, _, _| Err(down()));
        mock.expect_delete().returning(|_| Err(down()));
        mock.expect_exists().returning(|_| Err(down()));
        mock.expect_increment().returning(|_, _| Err(down()));
        mock.expect_expire().returning(|_, _| Err(down()));
        mock.expect_hash_get().returning(|_, _| Err(down()));
        mock.expect_hash_put().returning(|_, _, _| Err(down()));
        mock.expect_right_push().returning(|_, _| Err(down()));
        mock.expect_right_push_all().returning(|_, _| Err(down()));
        mock.expect_left_pop().returning(|_| Err(down()));
        mock.expect_range().returning(|_, _, _| Err(down()));
        mock
    }

    #[tokio::test]
    async fn test_every_primitive_degrades() {
        let accessor = ResilientAccessor::new(Arc::new(failing_backend()));

        assert_eq!(accessor.get("k").await, None);
        accessor.set("k", "v", Some(Duration::from_secs(1))).await;
        assert!(!accessor.set_if_absent("k", "v", None).await);
        assert!(!accessor.delete("k").await);
        assert!(!accessor.exists("k").await);
        assert_eq!(accessor.increment("k", 3).await, 0);
        assert!(!accessor.expire("k", Duration::from_secs(1)).await);
        assert_eq!(accessor.hash_get("k", "f").await, None);
        accessor.hash_put("k", "f", "v").await;
        assert_eq!(accessor.right_push("k", "v").await, 0);
        assert_eq!(accessor.right_push_all("k", &["v".to_string()]).await, 0);
        assert_eq!(accessor.left_pop("k").await, None);
        assert!(accessor.range("k", 0, -1).await.is_empty());
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let mut mock = MockKeyValueBackend::new();
        mock.expect_get()
            .times(1)
            .returning(|_| Ok(Some("cached".to_string())));
        mock.expect_increment().returning(|_, delta| Ok(delta * 2));

        let accessor = ResilientAccessor::new(Arc::new(mock));
        assert_eq!(accessor.get("u:14").await, Some("cached".to_string()));
        assert_eq!(accessor.increment("n", 4).await, 8);
    }
}
