//! Redis-backed key-value store.

use super::KeyValueBackend;
use async_trait::async_trait;
use cairn_config::RedisConfig;
use cairn_core::{CairnError, CairnResult};
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use shaku::Component;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Create a Redis connection pool and verify it with a `PING`.
pub async fn create_pool(config: &RedisConfig) -> CairnResult<Pool> {
    info!("Creating Redis connection pool...");

    let cfg = Config::from_url(&config.url);

    let pool = cfg
        .builder()
        .map_err(|e| CairnError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| CairnError::Configuration(format!("Failed to create pool: {}", e)))?;

    let mut conn = pool
        .get()
        .await
        .map_err(|e| CairnError::Backend(format!("Failed to get Redis connection: {}", e)))?;
    let _: String = redis::cmd("PING")
        .query_async(&mut *conn)
        .await
        .map_err(|e| CairnError::Backend(format!("Redis PING failed: {}", e)))?;

    info!("Redis connection pool created successfully");

    Ok(pool)
}

/// Millisecond TTL argument for `PSETEX`/`PEXPIRE`, at least 1.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn command_error<'a>(op: &'static str, key: &'a str) -> impl FnOnce(redis::RedisError) -> CairnError + 'a {
    move |e| CairnError::Backend(format!("{} failed for key '{}': {}", op, key, e))
}

/// Redis-based key-value backend.
#[derive(Component)]
#[shaku(interface = KeyValueBackend)]
pub struct RedisBackend {
    /// Redis connection pool. `None` when caching is disabled.
    pool: Option<Arc<Pool>>,
}

impl RedisBackend {
    /// Create a backend over an existing pool.
    #[must_use]
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool: Some(pool) }
    }

    /// Create a backend that fails every call (for when Redis is disabled).
    #[must_use]
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    /// Whether a pool is attached.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> CairnResult<deadpool_redis::Connection> {
        match &self.pool {
            Some(pool) => pool
                .get()
                .await
                .map_err(|e| CairnError::Backend(format!("Failed to get Redis connection: {}", e))),
            None => Err(CairnError::Backend("Cache is disabled".to_string())),
        }
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn get(&self, key: &str) -> CairnResult<Option<String>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.get(key).await.map_err(command_error("GET", key))?;

        match &value {
            Some(_) => debug!("Cache hit for key '{}'", key),
            None => debug!("Cache miss for key '{}'", key),
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CairnResult<()> {
        let mut conn = self.get_conn().await?;

        match ttl {
            Some(ttl) => {
                let millis = ttl_millis(ttl);
                conn.pset_ex::<_, _, ()>(key, value, millis)
                    .await
                    .map_err(command_error("PSETEX", key))?;
                debug!("Cached key '{}' with TTL {}ms", key, millis);
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(command_error("SET", key))?;
                debug!("Cached key '{}' without expiry", key);
            }
        }

        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> CairnResult<bool> {
        let mut conn = self.get_conn().await?;

        let written = match ttl {
            Some(ttl) => {
                let reply: Option<String> = redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("PX")
                    .arg(ttl_millis(ttl))
                    .query_async(&mut *conn)
                    .await
                    .map_err(command_error("SET NX", key))?;
                reply.is_some()
            }
            None => conn
                .set_nx::<_, _, bool>(key, value)
                .await
                .map_err(command_error("SETNX", key))?,
        };

        debug!("Set-if-absent on key '{}': {}", key, written);
        Ok(written)
    }

    async fn delete(&self, key: &str) -> CairnResult<bool> {
        let mut conn = self.get_conn().await?;
        let deleted: i64 = conn.del(key).await.map_err(command_error("DEL", key))?;

        debug!("Deleted key '{}': {}", key, deleted > 0);
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> CairnResult<bool> {
        let mut conn = self.get_conn().await?;
        let exists: bool = conn.exists(key).await.map_err(command_error("EXISTS", key))?;
        Ok(exists)
    }

    async fn increment(&self, key: &str, delta: i64) -> CairnResult<i64> {
        let mut conn = self.get_conn().await?;
        let value: i64 = conn.incr(key, delta).await.map_err(command_error("INCRBY", key))?;
        Ok(value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CairnResult<bool> {
        let mut conn = self.get_conn().await?;
        let millis = i64::try_from(ttl_millis(ttl)).unwrap_or(i64::MAX);
        let armed: bool = conn.pexpire(key, millis).await.map_err(command_error("PEXPIRE", key))?;

        debug!("Expire on key '{}' ({}ms): {}", key, millis, armed);
        Ok(armed)
    }

    async fn hash_get(&self, key: &str, field: &str) -> CairnResult<Option<String>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.hget(key, field).await.map_err(command_error("HGET", key))?;
        Ok(value)
    }

    async fn hash_put(&self, key: &str, field: &str, value: &str) -> CairnResult<()> {
        let mut conn = self.get_conn().await?;
        conn.hset::<_, _, _, ()>(key, field, value)
            .await
            .map_err(command_error("HSET", key))?;
        Ok(())
    }

    async fn right_push(&self, key: &str, value: &str) -> CairnResult<i64> {
        let mut conn = self.get_conn().await?;
        let len: i64 = conn.rpush(key, value).await.map_err(command_error("RPUSH", key))?;
        Ok(len)
    }

    async fn right_push_all(&self, key: &str, values: &[String]) -> CairnResult<i64> {
        let mut conn = self.get_conn().await?;
        let len: i64 = conn.rpush(key, values).await.map_err(command_error("RPUSH", key))?;
        Ok(len)
    }

    async fn left_pop(&self, key: &str) -> CairnResult<Option<String>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.lpop(key, None).await.map_err(command_error("LPOP", key))?;
        Ok(value)
    }

    async fn range(&self, key: &str, start: i64, stop: i64) -> CairnResult<Vec<String>> {
        let mut conn = self.get_conn().await?;
        let start = isize::try_from(start).unwrap_or(isize::MAX);
        let stop = isize::try_from(stop).unwrap_or(isize::MAX);
        let values: Vec<String> = conn
            .lrange(key, start, stop)
            .await
            .map_err(command_error("LRANGE", key))?;
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_backend() {
        let backend = RedisBackend::disabled();
        assert!(!backend.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_backend_fails_every_call() {
        let backend = RedisBackend::disabled();
        assert!(matches!(backend.get("k").await, Err(CairnError::Backend(_))));
        assert!(matches!(backend.set("k", "v", None).await, Err(CairnError::Backend(_))));
        assert!(matches!(backend.increment("k", 1).await, Err(CairnError::Backend(_))));
    }

    #[test]
    fn test_command_error_names_operation_and_key() {
        let key = String::from("u:14");
        let error = command_error("PSETEX", &key)(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection reset",
        )));

        match error {
            CairnError::Backend(msg) => {
                assert!(msg.starts_with("PSETEX failed for key 'u:14'"));
                assert!(msg.contains("connection reset"));
            }
            other => panic!("Expected Backend error, got {:?}", other),
        }
    }

    #[test]
    fn test_ttl_millis_floor() {
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::from_secs(60)), 60_000);
    }
}
