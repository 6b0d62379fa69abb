//! Dependency injection module using Shaku.
//!
//! The backend is built once at startup and shared by every
//! [`CacheManager`](crate::CacheManager) resolved from the module.

use crate::backend::{RedisBackend, RedisBackendParameters};
use cairn_core::module;
use deadpool_redis::Pool;
use std::sync::Arc;

// Cache module exposing the Redis backend as the `KeyValueBackend` component.
module! {
    pub CacheModule {
        components = [
            RedisBackend,
        ],
        providers = [],
    }
}

/// Builds the cache module.
///
/// Passing `None` wires a disabled backend, so every cache read misses.
#[must_use]
pub fn build_cache_module(pool: Option<Arc<Pool>>) -> Arc<CacheModule> {
    Arc::new(
        CacheModule::builder()
            .with_component_parameters::<RedisBackend>(RedisBackendParameters { pool })
            .build(),
    )
}
