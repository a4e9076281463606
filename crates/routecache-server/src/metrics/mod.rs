//! Metrics for the route cache server.

pub mod cache;
pub mod dispatch;
pub mod http;
pub mod setup;

pub use cache::{CacheMetrics, CacheStats, EvictionCause};
pub use dispatch::DispatchMetrics;
pub use setup::init_metrics;
