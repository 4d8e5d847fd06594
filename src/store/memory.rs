//! In-memory counter store.

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{AtomicCounterStore, CounterStore};

#[derive(Debug, Clone, Copy)]
struct Entry {
    tat: f64,
    hits: u64,
    expires_at: f64,
}

/// Counter store backed by a process-local map.
///
/// Beyond the TAT each entry carries a plain integer usage counter, bumped
/// once per write, so status endpoints can report how often a key has been
/// admitted within its current window. Expiry is judged against the
/// injected [`Clock`], which keeps TTL behavior testable; expired entries
/// are dropped lazily on access.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Fetch the live entry for `key`, purging it first if expired.
    fn live_entry(entries: &mut HashMap<String, Entry>, key: &str, now: f64) -> Option<Entry> {
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(*entry),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Store("counter map lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<f64>> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        Ok(Self::live_entry(&mut entries, key, now).map(|e| e.tat))
    }

    async fn set(&self, key: &str, value: f64, ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        let hits = Self::live_entry(&mut entries, key, now).map_or(0, |e| e.hits);
        entries.insert(
            key.to_string(),
            Entry {
                tat: value,
                hits: hits + 1,
                expires_at: now + ttl.as_secs_f64(),
            },
        );
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        Ok(Self::live_entry(&mut entries, key, now).is_some())
    }

    async fn usage(&self, key: &str) -> Result<Option<u64>> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        Ok(Self::live_entry(&mut entries, key, now).map(|e| e.hits))
    }
}

#[async_trait]
impl AtomicCounterStore for MemoryStore {
    async fn set_if_match(
        &self,
        key: &str,
        expected: Option<f64>,
        value: f64,
        ttl: Duration,
    ) -> Result<bool> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        let current = Self::live_entry(&mut entries, key, now);
        if current.map(|e| e.tat) != expected {
            return Ok(false);
        }
        let hits = current.map_or(0, |e| e.hits);
        entries.insert(
            key.to_string(),
            Entry {
                tat: value,
                hits: hits + 1,
                expires_at: now + ttl.as_secs_f64(),
            },
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store_with_clock() -> (MemoryStore, ManualClock) {
        let clock = ManualClock::new(1_000.0);
        let store = MemoryStore::with_clock(Arc::new(clock.clone()));
        (store, clock)
    }

    #[tokio::test]
    async fn get_returns_stored_value() {
        let (store, _clock) = store_with_clock();

        assert_eq!(store.get("a").await.unwrap(), None);
        store.set("a", 1_060.5, Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(1_060.5));
        assert!(store.has("a").await.unwrap());
    }

    #[tokio::test]
    async fn expired_keys_behave_as_absent() {
        let (store, clock) = store_with_clock();

        store.set("a", 1_060.0, Duration::from_secs(60)).await.unwrap();
        clock.advance(59.0);
        assert!(store.has("a").await.unwrap());

        clock.advance(2.0);
        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(!store.has("a").await.unwrap());
        assert_eq!(store.usage("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_rearms_expiry() {
        let (store, clock) = store_with_clock();

        store.set("a", 1.0, Duration::from_secs(10)).await.unwrap();
        clock.advance(8.0);
        store.set("a", 2.0, Duration::from_secs(10)).await.unwrap();
        clock.advance(8.0);

        // 16s after the first write, but only 8s after the refresh.
        assert_eq!(store.get("a").await.unwrap(), Some(2.0));
    }

    #[tokio::test]
    async fn usage_counts_writes_per_window() {
        let (store, clock) = store_with_clock();

        store.set("a", 1.0, Duration::from_secs(10)).await.unwrap();
        store.set("a", 2.0, Duration::from_secs(10)).await.unwrap();
        assert_eq!(store.usage("a").await.unwrap(), Some(2));

        // A fresh window starts the count over.
        clock.advance(11.0);
        store.set("a", 3.0, Duration::from_secs(10)).await.unwrap();
        assert_eq!(store.usage("a").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let (store, _clock) = store_with_clock();

        store.set("a", 1.0, Duration::from_secs(10)).await.unwrap();
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_if_match_enforces_expectations() {
        let (store, _clock) = store_with_clock();
        let ttl = Duration::from_secs(10);

        // Absent key: only a None expectation wins.
        assert!(!store.set_if_match("a", Some(1.0), 2.0, ttl).await.unwrap());
        assert!(store.set_if_match("a", None, 2.0, ttl).await.unwrap());

        // Present key: the expectation must match the live value.
        assert!(!store.set_if_match("a", None, 3.0, ttl).await.unwrap());
        assert!(!store.set_if_match("a", Some(9.0), 3.0, ttl).await.unwrap());
        assert!(store.set_if_match("a", Some(2.0), 3.0, ttl).await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), Some(3.0));
    }
}
