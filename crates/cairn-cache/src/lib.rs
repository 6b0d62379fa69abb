//! # Cairn Cache
//!
//! Cache-aside orchestration in front of a remote key-value store.
//!
//! [`CacheManager`] returns a cached result when one is present, otherwise
//! runs the supplied computation, stores the encoded result with a TTL and
//! returns it. Backend failures never reach the caller: the
//! [`ResilientAccessor`] turns them into misses and no-ops, so an outage
//! degrades to "always recompute".
//!
//! ```ignore
//! let backend = create_backend(&config.redis).await?;
//! let cache = CacheManager::new(backend);
//!
//! let user = cache
//!     .get_or_compute("u:14", &CacheOptions::seconds(600), || repo.find_user(14))
//!     .await?;
//! ```

mod aside;
pub mod backend;
pub mod codec;
pub mod di;
mod manager;
pub mod metrics;
mod options;
mod resilient;

pub use backend::{create_backend, create_pool, InMemoryBackend, KeyValueBackend, RedisBackend, RedisBackendParameters};
pub use codec::{is_blank, EntryCodec, JsonCodec, TextCodec, EMPTY_MAPPING, EMPTY_SEQUENCE};
pub use di::{build_cache_module, CacheModule};
pub use manager::CacheManager;
pub use options::{CacheOptions, TimeUnit, Ttl};
pub use resilient::ResilientAccessor;
