//! Process-local key-value backend.
//!
//! Mirrors the Redis semantics the cache layer relies on: per-key TTL,
//! `SET` clearing a previous TTL, `INCRBY`/`HSET`/`RPUSH` preserving it, and
//! `WRONGTYPE` failures when a key is used as the wrong structure.

use super::KeyValueBackend;
use async_trait::async_trait;
use cairn_core::{CairnError, CairnResult};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
}

impl Value {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Hash(_) => "hash",
            Self::List(_) => "list",
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

fn wrong_type(key: &str, expected: &str, found: &Value) -> CairnError {
    CairnError::Backend(format!(
        "WRONGTYPE key '{}' holds a {}, expected {}",
        key,
        found.type_name(),
        expected
    ))
}

/// Resolves a Redis-style inclusive range against a list of `len` items.
fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if start > stop || start >= len || stop < 0 {
        return None;
    }

    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}

/// Writes between full sweeps of expired keys.
const SWEEP_INTERVAL: usize = 256;

/// In-memory key-value backend.
///
/// Expired keys are evicted when touched, and every [`SWEEP_INTERVAL`]
/// writes a full sweep drops those nobody reads again.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: Mutex<HashMap<String, Slot>>,
    writes: AtomicUsize,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|slot| !slot.is_expired(now)).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time to live of `key`, `None` if absent or persistent.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        Self::live(&mut entries, key, now)?
            .expires_at
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Drops every expired key. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        Self::sweep(&mut entries, Instant::now())
    }

    fn sweep(entries: &mut HashMap<String, Slot>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, slot| !slot.is_expired(now));
        before - entries.len()
    }

    /// Counts a write and sweeps once every [`SWEEP_INTERVAL`] of them.
    fn note_write(&self, entries: &mut HashMap<String, Slot>) {
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            let removed = Self::sweep(entries, Instant::now());
            if removed > 0 {
                debug!(removed, "Swept expired in-memory keys");
            }
        }
    }

    /// Returns the live slot at `key`, evicting it first if it has expired.
    fn live<'a>(entries: &'a mut HashMap<String, Slot>, key: &str, now: Instant) -> Option<&'a mut Slot> {
        if entries.get(key).is_some_and(|slot| slot.is_expired(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }

    /// Applies `f` to the list at `key`, creating it when absent.
    fn with_list<T>(&self, key: &str, f: impl FnOnce(&mut VecDeque<String>) -> T) -> CairnResult<T> {
        let mut entries = self.entries.lock();
        self.note_write(&mut entries);
        let now = Instant::now();
        if Self::live(&mut entries, key, now).is_none() {
            entries.insert(key.to_string(), Slot::new(Value::List(VecDeque::new()), None));
        }
        match entries.get_mut(key).map(|slot| &mut slot.value) {
            Some(Value::List(list)) => Ok(f(list)),
            Some(other) => Err(wrong_type(key, "list", other)),
            None => Err(CairnError::internal("list slot vanished")),
        }
    }
}

#[async_trait]
impl KeyValueBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> CairnResult<Option<String>> {
        let mut entries = self.entries.lock();
        match Self::live(&mut entries, key, Instant::now()) {
            None => Ok(None),
            Some(Slot {
                value: Value::Text(text),
                ..
            }) => Ok(Some(text.clone())),
            Some(slot) => Err(wrong_type(key, "string", &slot.value)),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CairnResult<()> {
        let mut entries = self.entries.lock();
        self.note_write(&mut entries);
        entries.insert(key.to_string(), Slot::new(Value::Text(value.to_string()), ttl));
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> CairnResult<bool> {
        let mut entries = self.entries.lock();
        self.note_write(&mut entries);
        if Self::live(&mut entries, key, Instant::now()).is_some() {
            return Ok(false);
        }
        entries.insert(key.to_string(), Slot::new(Value::Text(value.to_string()), ttl));
        Ok(true)
    }

    async fn delete(&self, key: &str) -> CairnResult<bool> {
        let mut entries = self.entries.lock();
        let existed = Self::live(&mut entries, key, Instant::now()).is_some();
        entries.remove(key);
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> CairnResult<bool> {
        let mut entries = self.entries.lock();
        Ok(Self::live(&mut entries, key, Instant::now()).is_some())
    }

    async fn increment(&self, key: &str, delta: i64) -> CairnResult<i64> {
        let mut entries = self.entries.lock();
        self.note_write(&mut entries);
        match Self::live(&mut entries, key, Instant::now()) {
            None => {
                entries.insert(key.to_string(), Slot::new(Value::Text(delta.to_string()), None));
                Ok(delta)
            }
            Some(Slot {
                value: Value::Text(text),
                ..
            }) => {
                let current: i64 = text.parse().map_err(|_| {
                    CairnError::Backend(format!("value at '{}' is not an integer", key))
                })?;
                let next = current
                    .checked_add(delta)
                    .ok_or_else(|| CairnError::Backend(format!("increment at '{}' would overflow", key)))?;
                *text = next.to_string();
                Ok(next)
            }
            Some(slot) => Err(wrong_type(key, "string", &slot.value)),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CairnResult<bool> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        match Self::live(&mut entries, key, now) {
            Some(slot) => {
                slot.expires_at = Some(now + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn hash_get(&self, key: &str, field: &str) -> CairnResult<Option<String>> {
        let mut entries = self.entries.lock();
        match Self::live(&mut entries, key, Instant::now()) {
            None => Ok(None),
            Some(Slot {
                value: Value::Hash(hash),
                ..
            }) => Ok(hash.get(field).cloned()),
            Some(slot) => Err(wrong_type(key, "hash", &slot.value)),
        }
    }

    async fn hash_put(&self, key: &str, field: &str, value: &str) -> CairnResult<()> {
        let mut entries = self.entries.lock();
        self.note_write(&mut entries);
        match Self::live(&mut entries, key, Instant::now()) {
            None => {
                let hash = HashMap::from([(field.to_string(), value.to_string())]);
                entries.insert(key.to_string(), Slot::new(Value::Hash(hash), None));
                Ok(())
            }
            Some(Slot {
                value: Value::Hash(hash),
                ..
            }) => {
                hash.insert(field.to_string(), value.to_string());
                Ok(())
            }
            Some(slot) => Err(wrong_type(key, "hash", &slot.value)),
        }
    }

    async fn right_push(&self, key: &str, value: &str) -> CairnResult<i64> {
        self.with_list(key, |list| {
            list.push_back(value.to_string());
            i64::try_from(list.len()).unwrap_or(i64::MAX)
        })
    }

    async fn right_push_all(&self, key: &str, values: &[String]) -> CairnResult<i64> {
        self.with_list(key, |list| {
            list.extend(values.iter().cloned());
            i64::try_from(list.len()).unwrap_or(i64::MAX)
        })
    }

    async fn left_pop(&self, key: &str) -> CairnResult<Option<String>> {
        let mut entries = self.entries.lock();
        let popped = match Self::live(&mut entries, key, Instant::now()) {
            None => return Ok(None),
            Some(Slot {
                value: Value::List(list),
                ..
            }) => (list.pop_front(), list.is_empty()),
            Some(slot) => return Err(wrong_type(key, "list", &slot.value)),
        };

        // Redis deletes a list once its last element is popped.
        if popped.1 {
            entries.remove(key);
        }
        Ok(popped.0)
    }

    async fn range(&self, key: &str, start: i64, stop: i64) -> CairnResult<Vec<String>> {
        let mut entries = self.entries.lock();
        match Self::live(&mut entries, key, Instant::now()) {
            None => Ok(Vec::new()),
            Some(Slot {
                value: Value::List(list),
                ..
            }) => Ok(resolve_range(list.len(), start, stop)
                .map(|(from, to)| list.range(from..=to).cloned().collect())
                .unwrap_or_default()),
            Some(slot) => Err(wrong_type(key, "list", &slot.value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_with_ttl_expires() {
        let backend = InMemoryBackend::new();
        backend.set("k", "v", Some(Duration::from_secs(10))).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some("v".to_string()));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(backend.get("k").await.unwrap(), None);
        assert!(!backend.exists("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_clears_previous_ttl() {
        let backend = InMemoryBackend::new();
        backend.set("k", "v1", Some(Duration::from_secs(5))).await.unwrap();
        backend.set("k", "v2", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(backend.get("k").await.unwrap(), Some("v2".to_string()));
        assert_eq!(backend.ttl("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_drops_untouched_keys() {
        let backend = InMemoryBackend::new();
        for i in 0..5 {
            backend.set(&format!("tmp:{}", i), "v", Some(Duration::from_secs(1))).await.unwrap();
        }
        backend.set("kept", "v", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(backend.purge_expired(), 5);
        assert_eq!(backend.entries.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_sweep_expired_keys() {
        let backend = InMemoryBackend::new();
        backend.set("stale", "v", Some(Duration::from_secs(1))).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        for _ in 0..SWEEP_INTERVAL {
            backend.increment("counter", 1).await.unwrap();
        }

        assert!(!backend.entries.lock().contains_key("stale"));
        assert_eq!(backend.entries.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_set_if_absent() {
        let backend = InMemoryBackend::new();
        assert!(backend.set_if_absent("lock", "a", Some(Duration::from_secs(30))).await.unwrap());
        assert!(!backend.set_if_absent("lock", "b", Some(Duration::from_secs(30))).await.unwrap());
        assert_eq!(backend.get("lock").await.unwrap(), Some("a".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_if_absent_after_expiry() {
        let backend = InMemoryBackend::new();
        assert!(backend.set_if_absent("lock", "a", Some(Duration::from_secs(1))).await.unwrap());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(backend.set_if_absent("lock", "b", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_increment() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.increment("n", 5).await.unwrap(), 5);
        assert_eq!(backend.increment("n", -2).await.unwrap(), 3);

        backend.set("s", "abc", None).await.unwrap();
        assert!(backend.increment("s", 1).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_rearms_hash() {
        let backend = InMemoryBackend::new();
        assert!(!backend.expire("h", Duration::from_secs(5)).await.unwrap());

        backend.hash_put("h", "f1", "a").await.unwrap();
        assert!(backend.expire("h", Duration::from_secs(5)).await.unwrap());
        backend.hash_put("h", "f2", "b").await.unwrap();
        assert_eq!(backend.ttl("h"), Some(Duration::from_secs(5)));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(backend.hash_get("h", "f1").await.unwrap(), None);
        assert_eq!(backend.hash_get("h", "f2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let backend = InMemoryBackend::new();
        backend.hash_put("h", "f", "v").await.unwrap();
        assert!(matches!(backend.get("h").await, Err(CairnError::Backend(_))));
        assert!(backend.right_push("h", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_list_queue_semantics() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.right_push("q", "a").await.unwrap(), 1);
        let more = vec!["b".to_string(), "c".to_string()];
        assert_eq!(backend.right_push_all("q", &more).await.unwrap(), 3);

        assert_eq!(backend.range("q", 0, -1).await.unwrap(), vec!["a", "b", "c"]);
        assert_eq!(backend.range("q", -2, -1).await.unwrap(), vec!["b", "c"]);
        assert_eq!(backend.range("q", 1, 100).await.unwrap(), vec!["b", "c"]);
        assert!(backend.range("q", 5, 10).await.unwrap().is_empty());

        assert_eq!(backend.left_pop("q").await.unwrap(), Some("a".to_string()));
        assert_eq!(backend.left_pop("q").await.unwrap(), Some("b".to_string()));
        assert_eq!(backend.left_pop("q").await.unwrap(), Some("c".to_string()));
        assert_eq!(backend.left_pop("q").await.unwrap(), None);
        assert!(!backend.exists("q").await.unwrap());
    }

    #[test]
    fn test_resolve_range() {
        assert_eq!(resolve_range(3, 0, -1), Some((0, 2)));
        assert_eq!(resolve_range(3, -10, 1), Some((0, 1)));
        assert_eq!(resolve_range(3, 2, 1), None);
        assert_eq!(resolve_range(0, 0, -1), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = InMemoryBackend::new();
        backend.set("k", "v", None).await.unwrap();
        assert_eq!(backend.len(), 1);
        assert!(backend.delete("k").await.unwrap());
        assert!(!backend.delete("k").await.unwrap());
        assert!(backend.is_empty());
    }
}
