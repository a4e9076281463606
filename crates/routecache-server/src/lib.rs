//! # RouteCache Server
//!
//! Route-keyed response cache on top of [`routecache_core`].
//!
//! - [`RouteCache`]: the service. Reads subscribe their address, writes
//!   publish theirs, and notified subscribers evict from the active store.
//! - [`store`]: the [`CacheStore`](store::CacheStore) trait and the Moka
//!   backed [`MemoryStore`](store::MemoryStore).
//! - [`middleware`]: axum adapters that cache GET responses and publish
//!   after writes.
//! - [`server`]: the demo HTTP application.

pub mod background;
pub mod error;
pub mod handlers;
pub mod loader;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod service;
pub mod settings;
pub mod state;
pub mod store;

// Re-exports
pub use error::{AppError, ServiceError};
pub use loader::{FnLoader, Loader, StaticLoader};
pub use crate::metrics::init_metrics;
pub use server::{create_router, create_router_with_metrics, run_server};
pub use service::{ReadOutcome, RouteCache, RouteCacheBuilder};
pub use settings::{Settings, SettingsError};
pub use state::AppState;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
