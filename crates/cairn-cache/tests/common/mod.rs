//! Shared helpers for cache integration tests.

#![allow(dead_code)]

use cairn_cache::{CacheManager, InMemoryBackend};
use cairn_core::CairnError;
use futures::future::{self, Ready};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A manager over a fresh in-memory backend, plus the backend for inspection.
pub fn memory_cache() -> (Arc<InMemoryBackend>, CacheManager) {
    let backend = Arc::new(InMemoryBackend::new());
    let cache = CacheManager::new(backend.clone());
    (backend, cache)
}

/// Supplier that counts its invocations and yields `value`.
pub fn counted<'a, T: 'a>(
    calls: &'a AtomicUsize,
    value: Option<T>,
) -> impl FnOnce() -> Ready<Result<Option<T>, CairnError>> + 'a {
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        future::ready(Ok(value))
    }
}

pub fn count(calls: &AtomicUsize) -> usize {
    calls.load(Ordering::SeqCst)
}
