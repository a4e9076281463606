//! Stores de prueba.

use async_trait::async_trait;
use routecache_server::store::{CacheStore, StoreError};

/// Store whose every operation fails.
pub struct FailingStore;

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn evict(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn cleanup(&self) -> Result<(), StoreError> {
        Err(StoreError::backend("cannot flush"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}
