//! Cache-aside operations.
//!
//! Every family follows the same protocol: a blank key returns the empty
//! default, a non-blank cached entry is decoded and returned, otherwise the
//! supplier runs and its result is written back before being returned.
//! Supplier errors propagate unchanged and are never cached. A cached entry
//! that fails to decode is reported as [`CairnError::MalformedEntry`].

use crate::codec::{is_blank, EntryCodec, JsonCodec, TextCodec, EMPTY_MAPPING, EMPTY_SEQUENCE};
use crate::manager::CacheManager;
use crate::metrics;
use crate::options::CacheOptions;
use cairn_core::CairnError;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use tracing::debug;

const SCALAR: &str = "scalar";
const LIST: &str = "list";
const MAP: &str = "map";
const HASH_LIST: &str = "hash_list";

/// Location of an entry in the backend.
#[derive(Debug, Clone, Copy)]
enum Address<'a> {
    /// A plain string key.
    Key(&'a str),
    /// A field inside the hash at `key`. The TTL belongs to the whole hash.
    Field { key: &'a str, field: &'a str },
}

impl<'a> Address<'a> {
    const fn key(&self) -> &'a str {
        match *self {
            Self::Key(key) | Self::Field { key, .. } => key,
        }
    }
}

/// Sequence and mapping results, which share the empty-sentinel policy.
trait CachedCollection: Serialize + DeserializeOwned + Default {
    const SENTINEL: &'static str;

    fn is_empty(&self) -> bool;
}

impl<T> CachedCollection for Vec<T>
where
    T: Serialize + DeserializeOwned,
{
    const SENTINEL: &'static str = EMPTY_SEQUENCE;

    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

impl<K, V> CachedCollection for HashMap<K, V>
where
    K: Serialize + DeserializeOwned + Eq + Hash,
    V: Serialize + DeserializeOwned,
{
    const SENTINEL: &'static str = EMPTY_MAPPING;

    fn is_empty(&self) -> bool {
        HashMap::is_empty(self)
    }
}

impl CacheManager {
    /// Return the value cached at `key`, or compute, store and return it.
    ///
    /// The value is stored as JSON. A supplier result of `None` is returned
    /// as-is and never stored, and neither is a blank string. Use
    /// [`CacheManager::get_or_compute_text`] to store strings raw; a `String`
    /// read here still accepts raw entries.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        options: &CacheOptions,
        supplier: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CairnError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        self.scalar_aside(&JsonCodec, key, options, supplier).await
    }

    /// String variant of [`CacheManager::get_or_compute`].
    ///
    /// The text is stored raw, so it round-trips byte-for-byte. An empty or
    /// whitespace-only string is never stored, since blank entries read as
    /// misses.
    pub async fn get_or_compute_text<E, F, Fut>(
        &self,
        key: &str,
        options: &CacheOptions,
        supplier: F,
    ) -> Result<Option<String>, E>
    where
        E: From<CairnError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<String>, E>>,
    {
        self.scalar_aside(&TextCodec, key, options, supplier).await
    }

    /// Return the sequence cached at `key`, or compute, store and return it.
    ///
    /// An empty result is stored as `[]` only when `options.cache_empty` is
    /// set. A `None` result is never stored and is returned as an empty `Vec`.
    pub async fn get_or_compute_list<T, E, F, Fut>(
        &self,
        key: &str,
        options: &CacheOptions,
        supplier: F,
    ) -> Result<Vec<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CairnError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Vec<T>>, E>>,
    {
        self.collection_aside(Address::Key(key), LIST, options, supplier).await
    }

    /// Return the mapping cached at `key`, or compute, store and return it.
    ///
    /// Same empty-result policy as [`CacheManager::get_or_compute_list`],
    /// with `{}` as the sentinel.
    pub async fn get_or_compute_map<K, V, E, F, Fut>(
        &self,
        key: &str,
        options: &CacheOptions,
        supplier: F,
    ) -> Result<HashMap<K, V>, E>
    where
        K: Serialize + DeserializeOwned + Eq + Hash,
        V: Serialize + DeserializeOwned,
        E: From<CairnError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<HashMap<K, V>>, E>>,
    {
        self.collection_aside(Address::Key(key), MAP, options, supplier).await
    }

    /// Sequence cache-aside addressed by `field` inside the hash at `key`.
    ///
    /// Every store re-arms the TTL of the whole hash, so all fields share
    /// one expiry. The `[]` sentinel does not record which policy wrote it:
    /// a later call with `cache_empty` off still reads it as an empty hit.
    /// A blank `field` computes without touching the cache.
    pub async fn get_or_compute_hash_list<T, E, F, Fut>(
        &self,
        key: &str,
        field: &str,
        options: &CacheOptions,
        supplier: F,
    ) -> Result<Vec<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CairnError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Vec<T>>, E>>,
    {
        self.collection_aside(Address::Field { key, field }, HASH_LIST, options, supplier)
            .await
    }

    async fn scalar_aside<T, C, E, F, Fut>(
        &self,
        codec: &C,
        key: &str,
        options: &CacheOptions,
        supplier: F,
    ) -> Result<Option<T>, E>
    where
        C: EntryCodec<T>,
        E: From<CairnError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if is_blank(key) {
            return Ok(None);
        }

        let address = Address::Key(key);
        if let Some(text) = self.read(address, SCALAR, |text| codec.is_blank_entry(text)).await {
            return codec.decode(key, &text).map(Some).map_err(E::from);
        }

        let computed = supplier().await?;
        if let Some(value) = &computed {
            let text = codec.encode(value).map_err(E::from)?;
            if codec.is_blank_entry(&text) {
                debug!(key, "Blank result not cached");
            } else {
                self.write(address, &text, options, SCALAR).await;
            }
        }

        Ok(computed)
    }

    async fn collection_aside<C, E, F, Fut>(
        &self,
        address: Address<'_>,
        family: &'static str,
        options: &CacheOptions,
        supplier: F,
    ) -> Result<C, E>
    where
        C: CachedCollection,
        E: From<CairnError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<C>, E>>,
    {
        let key = address.key();
        if is_blank(key) {
            return Ok(C::default());
        }

        if let Some(text) = self.read(address, family, is_blank).await {
            return JsonCodec.decode(key, &text).map_err(E::from);
        }

        let computed = supplier().await?;
        match &computed {
            Some(items) if !items.is_empty() => {
                let text = JsonCodec.encode(items).map_err(E::from)?;
                self.write(address, &text, options, family).await;
            }
            Some(_) if options.cache_empty => {
                self.write(address, C::SENTINEL, options, family).await;
            }
            _ => debug!(key, family, "Empty result not cached"),
        }

        Ok(computed.unwrap_or_default())
    }

    /// Reads the entry at `address`. Text matching `is_empty` counts as a miss.
    async fn read<P>(&self, address: Address<'_>, family: &'static str, is_empty: P) -> Option<String>
    where
        P: Fn(&str) -> bool,
    {
        let cached = match address {
            Address::Key(key) => self.get(key).await,
            Address::Field { key, field } => self.get_hash(key, field).await,
        }
        .filter(|text| !is_empty(text.as_str()));

        match &cached {
            Some(_) => {
                metrics::record_hit(family);
                debug!(key = address.key(), family, "Cache-aside hit");
            }
            None => {
                metrics::record_miss(family);
                debug!(key = address.key(), family, "Cache-aside miss");
            }
        }

        cached
    }

    /// Stores `text` at `address`. Returns whether a write was issued.
    async fn write(&self, address: Address<'_>, text: &str, options: &CacheOptions, family: &'static str) -> bool {
        if is_blank(text) {
            debug!(key = address.key(), family, "Blank entry not cached");
            return false;
        }

        match address {
            Address::Key(key) => self.set_with_ttl(key, text, options.ttl).await,
            Address::Field { key, field } => {
                if is_blank(field) {
                    debug!(key, family, "Blank hash field, entry not cached");
                    return false;
                }
                self.put_hash(key, field, text).await;
                self.expire(key, options.ttl).await;
            }
        }

        metrics::record_store(family);
        debug!(key = address.key(), family, ttl = ?options.ttl, "Cache-aside stored");
        true
    }
}
