//! In-process store using Moka.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::notification::RemovalCause;

use super::{CacheStore, StoreConfig, StoreError};
use crate::metrics::{CacheMetrics, EvictionCause};

/// Store en memoria usando Moka.
/// Thread-safe y async-friendly; los clones comparten las mismas entries.
///
/// # Examples
///
/// ```no_run
/// use routecache_server::store::{CacheStore, MemoryStore, StoreConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), routecache_server::store::StoreError> {
/// let store = MemoryStore::new(StoreConfig::default());
/// store.set("/users/1", "{}".to_string()).await?;
///
/// if let Some(value) = store.get("/users/1").await? {
///     println!("cached: {value}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    inner: Cache<String, String>,
    metrics: CacheMetrics,
}

impl MemoryStore {
    /// Crea un nuevo store con la configuracion dada.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_metrics(config, CacheMetrics::new())
    }

    /// Like [`MemoryStore::new`], reporting into existing metrics.
    pub fn with_metrics(config: StoreConfig, metrics: CacheMetrics) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);

        if let Some(ttl) = config.ttl_seconds {
            builder = builder.time_to_live(Duration::from_secs(ttl));
        }
        if let Some(tti) = config.tti_seconds {
            builder = builder.time_to_idle(Duration::from_secs(tti));
        }

        // Listener para evictions
        let eviction_metrics = metrics.clone();
        builder = builder.eviction_listener(move |_key, _value, cause| {
            let cause = match cause {
                RemovalCause::Expired => EvictionCause::Expired,
                RemovalCause::Size => EvictionCause::Capacity,
                RemovalCause::Explicit => EvictionCause::Invalidated,
                // an overwrite keeps the key cached
                RemovalCause::Replaced => return,
            };
            eviction_metrics.record_eviction(cause);
        });

        Self {
            inner: builder.build(),
            metrics,
        }
    }

    /// Retorna el numero aproximado de entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Returns true if `key` currently holds a value.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Retorna las metricas para acceso externo.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Applies pending evictions and refreshes the entry gauge.
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
        self.metrics.update_entry_count(self.inner.entry_count());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let start = Instant::now();
        let value = self.inner.get(key).await;
        self.metrics.record_operation_duration("get", start.elapsed());
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let start = Instant::now();
        self.inner.insert(key.to_string(), value).await;
        self.metrics.record_operation_duration("set", start.elapsed());
        self.metrics.update_entry_count(self.inner.entry_count());
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<(), StoreError> {
        let start = Instant::now();
        self.inner.invalidate(key).await;
        self.metrics.record_operation_duration("evict", start.elapsed());
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), StoreError> {
        self.inner.invalidate_all();
        self.sync().await;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::default();

        store.set("/users/1", "alice".to_string()).await.unwrap();

        assert_eq!(
            store.get("/users/1").await.unwrap(),
            Some("alice".to_string())
        );
        assert!(store.contains("/users/1"));
    }

    #[tokio::test]
    async fn test_miss_returns_none() {
        let store = MemoryStore::default();

        assert!(store.get("/nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_evict_removes_entry() {
        let store = MemoryStore::default();
        store.set("/users/1", "alice".to_string()).await.unwrap();

        store.evict("/users/1").await.unwrap();

        assert!(store.get("/users/1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_is_not_an_eviction() {
        let store = MemoryStore::default();
        store.set("/users/1", "alice".to_string()).await.unwrap();
        store.set("/users/1", "bob".to_string()).await.unwrap();
        store.sync().await;

        assert_eq!(store.metrics().evictions(), 0);

        store.evict("/users/1").await.unwrap();
        store.sync().await;

        assert_eq!(store.metrics().evictions(), 1);
    }

    #[tokio::test]
    async fn test_evict_missing_key_is_ok() {
        let store = MemoryStore::default();

        assert!(store.evict("/never/stored").await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_drops_everything() {
        let store = MemoryStore::default();
        store.set("/a", "1".to_string()).await.unwrap();
        store.set("/b", "2".to_string()).await.unwrap();

        store.cleanup().await.unwrap();

        assert!(store.get("/a").await.unwrap().is_none());
        assert!(store.get("/b").await.unwrap().is_none());
        assert_eq!(store.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryStore::default();
        let clone = store.clone();

        store.set("/shared", "x".to_string()).await.unwrap();

        assert!(clone.get("/shared").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ttl_expires_entries() {
        let store = MemoryStore::new(StoreConfig {
            ttl_seconds: Some(1),
            ..StoreConfig::default()
        });
        store.set("/short", "lived".to_string()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_100)).await;

        assert!(store.get("/short").await.unwrap().is_none());
    }
}
