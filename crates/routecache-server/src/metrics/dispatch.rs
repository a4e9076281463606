//! Publish/notification metrics.

use metrics::{counter, histogram};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Registra las descripciones de las metricas de dispatch.
pub fn register_dispatch_metrics() {
    metrics::describe_counter!(
        "routecache_publish_total",
        "Total number of publish calls"
    );
    metrics::describe_counter!(
        "routecache_notifications_total",
        "Total number of subscriber callbacks invoked"
    );
    metrics::describe_histogram!(
        "routecache_publish_fanout",
        "Subscribers notified per publish"
    );
    metrics::describe_counter!(
        "routecache_eviction_failures_total",
        "Store evictions that returned an error"
    );
}

/// Recorder for publish activity.
#[derive(Debug, Clone, Default)]
pub struct DispatchMetrics {
    publishes: Arc<AtomicU64>,
    notifications: Arc<AtomicU64>,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one publish and the number of subscribers it reached.
    pub fn record_publish(&self, generic: bool, freeze: bool, notified: usize) {
        self.publishes.fetch_add(1, Ordering::Relaxed);
        self.notifications
            .fetch_add(notified as u64, Ordering::Relaxed);

        let kind = if generic { "generic" } else { "concrete" };
        counter!(
            "routecache_publish_total",
            "kind" => kind,
            "freeze" => freeze.to_string()
        )
        .increment(1);
        counter!("routecache_notifications_total").increment(notified as u64);
        histogram!("routecache_publish_fanout", "kind" => kind).record(notified as f64);
    }

    /// Records a store eviction that failed.
    pub fn record_eviction_failure(&self, store: &str) {
        counter!("routecache_eviction_failures_total", "store" => store.to_string()).increment(1);
    }

    pub fn publishes(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }

    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }
}
