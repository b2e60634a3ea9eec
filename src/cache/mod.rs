// src/cache/mod.rs
//! License cache
//!
//! Maps resolution keys to normalized license text. Keys come from several
//! namespaces that may alias one text: package ids, license/project/
//! repository URLs, and filesystem paths. The cache is never evicted during
//! a run; callers clear it between batches to reclaim memory.
//!
//! Concurrent lookups for one key collapse into a single computation via
//! [`RequestCoalescer`].

mod coalesce;

pub use coalesce::RequestCoalescer;

use crate::error::Result;
use dashmap::DashMap;
use std::future::Future;

/// Shared key -> license text map with single-flight resolution
#[derive(Default)]
pub struct LicenseCache {
    entries: DashMap<String, String>,
    coalescer: RequestCoalescer,
}

impl LicenseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|text| text.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn put(&self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(key.into(), text.into());
    }

    /// Record `text` under every key that led to it
    pub fn put_all<I, K>(&self, keys: I, text: &str)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        for key in keys {
            self.entries.insert(key.into(), text.to_string());
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups that were served by another task's in-flight work
    pub fn coalesced_count(&self) -> u64 {
        self.coalescer.coalesced_count()
    }

    /// Return the cached text for `key`, or resolve it at most once
    ///
    /// `resolve` is responsible for writing its result into the cache (under
    /// all of its keys); the cache is re-checked once this task holds the
    /// flight so a result published just before is not computed twice.
    pub async fn get_or_resolve<F, Fut>(&self, key: &str, resolve: F) -> Result<Option<String>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<String>>>,
    {
        if let Some(text) = self.get(key) {
            return Ok(Some(text));
        }
        self.coalescer
            .coalesce(key, || async move {
                if let Some(text) = self.get(key) {
                    return Ok(Some(text));
                }
                resolve().await
            })
            .await
    }

    /// Single-flight `resolve` on `flight_key` without consulting the cache
    pub async fn coalesce<F, Fut>(&self, flight_key: &str, resolve: F) -> Result<Option<String>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<String>>>,
    {
        self.coalescer.coalesce(flight_key, resolve).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_put_get_clear() {
        let cache = LicenseCache::new();
        assert!(cache.is_empty());

        cache.put("Newtonsoft.Json", "MIT");
        cache.put_all(["https://licenses.nuget.org/MIT", "/pkgs/newtonsoft.json"], "MIT");

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("https://licenses.nuget.org/MIT").as_deref(), Some("MIT"));
        assert!(cache.contains("/pkgs/newtonsoft.json"));
        assert_eq!(cache.get("missing"), None);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_get_or_resolve_hits_cache() {
        let cache = LicenseCache::new();
        cache.put("Serilog", "Apache-2.0");

        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let text = cache
            .get_or_resolve("Serilog", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .await
            .unwrap();

        assert_eq!(text.as_deref(), Some("Apache-2.0"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_get_or_resolve_runs_once() {
        let cache = Arc::new(LicenseCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                let inner = Arc::clone(&cache);
                cache
                    .get_or_resolve("Polly", || async move {
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                        calls.fetch_add(1, Ordering::SeqCst);
                        inner.put("Polly", "BSD-3-Clause");
                        Ok(Some("BSD-3-Clause".to_string()))
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().as_deref(), Some("BSD-3-Clause"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
