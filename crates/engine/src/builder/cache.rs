//! Per-builder value cache.
//!
//! Keys are compared ASCII case-insensitively. Lookups that found nothing are
//! cached too. The bulk map is filled at most once and never changes after.

use secrecy::{ExposeSecret, SecretString};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// A value as held in the cache.
#[derive(Debug, Clone)]
pub(crate) struct CachedEntry {
    /// Key as the source spelled it.
    pub(crate) key: String,
    pub(crate) value: SecretString,
}

impl CachedEntry {
    pub(crate) fn new(key: String, value: String) -> Self {
        Self {
            key,
            value: SecretString::new(value.into()),
        }
    }

    pub(crate) fn expose(&self) -> String {
        self.value.expose_secret().to_string()
    }
}

/// Lowercased key -> entry, ordered for deterministic greedy writes.
pub(crate) type BulkValues = BTreeMap<String, CachedEntry>;

#[derive(Debug, Default)]
pub(crate) struct ValueCache {
    values: Mutex<HashMap<String, Option<SecretString>>>,
    bulk: Mutex<Option<Arc<BulkValues>>>,
}

pub(crate) fn cache_key(key: &str) -> String {
    key.to_ascii_lowercase()
}

impl ValueCache {
    /// `Some(result)` when `key` was looked up before.
    pub(crate) fn get(&self, key: &str) -> Option<Option<String>> {
        lock(&self.values)
            .get(&cache_key(key))
            .map(|value| value.as_ref().map(|v| v.expose_secret().to_string()))
    }

    /// Remember a lookup result. If another thread stored one first, that
    /// result wins and is returned.
    pub(crate) fn insert(&self, key: &str, value: Option<String>) -> Option<String> {
        let mut values = lock(&self.values);
        let stored = values
            .entry(cache_key(key))
            .or_insert_with(|| value.map(|v| SecretString::new(v.into())));
        stored.as_ref().map(|v| v.expose_secret().to_string())
    }

    /// Return the bulk map, running `fetch` if this is the first request.
    /// The bulk lock is held across `fetch`, so it runs at most once.
    pub(crate) fn bulk_or_fetch<F, E>(&self, fetch: F) -> Result<Arc<BulkValues>, E>
    where
        F: FnOnce() -> Result<Vec<(String, String)>, E>,
    {
        let mut bulk = lock(&self.bulk);
        if let Some(values) = bulk.as_ref() {
            return Ok(Arc::clone(values));
        }

        // Later duplicates overwrite earlier ones: last write wins.
        let values: BulkValues = fetch()?
            .into_iter()
            .map(|(key, value)| (cache_key(&key), CachedEntry::new(key, value)))
            .collect();
        let values = Arc::new(values);
        *bulk = Some(Arc::clone(&values));
        Ok(values)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
