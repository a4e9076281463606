//! Cache stores.
//!
//! A store maps a route address to a serialized response. The service talks
//! to it only through [`CacheStore`], so any backend (in-process, remote)
//! can be plugged in through a factory.
//!
//! - [`MemoryStore`]: Moka-backed in-process store, the default.
//! - [`CachedResponse`]: the envelope HTTP responses are stored as.
//! - [`ResponseCodec`]: how an envelope is turned into the stored string,
//!   JSON ([`JsonCodec`]) unless the service is built with another one.

pub mod codec;
pub mod memory;
pub mod response;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use codec::{JsonCodec, ResponseCodec, SharedCodec};
pub use memory::MemoryStore;
pub use response::CachedResponse;

/// Shared handle to the active store.
pub type SharedStore = Arc<dyn CacheStore>;

/// Errores de un backend de cache.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed to serve the operation.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A custom response codec rejected a value.
    #[error("codec error: {0}")]
    Codec(String),

    /// The backend is temporarily unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Creates a Backend error.
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend(reason.into())
    }

    /// Creates a Codec error.
    pub fn codec(reason: impl Into<String>) -> Self {
        Self::Codec(reason.into())
    }

    /// Creates an Unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Returns true if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Key/value store holding cached responses by address.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn evict(&self, key: &str) -> Result<(), StoreError>;

    /// Drops every entry. Called before a store is replaced and on reset.
    async fn cleanup(&self) -> Result<(), StoreError>;

    /// Backend name, used in logs.
    fn name(&self) -> &str;
}

/// Configuracion del store en memoria.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Maximo numero de entries (default: 10000)
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// TTL en segundos (opcional; sin TTL las entries viven hasta ser invalidadas)
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
    /// Time-to-idle en segundos (opcional)
    #[serde(default)]
    pub tti_seconds: Option<u64>,
}

fn default_max_capacity() -> u64 {
    10_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            ttl_seconds: None,
            tti_seconds: None,
        }
    }
}
