//! Background store work: evictions triggered by notifications and
//! write-backs from the HTTP subscriber.
//!
//! Subscriber callbacks are synchronous while store operations are async,
//! so work is spawned on the current Tokio runtime. Handles are kept so
//! callers that need a consistent store (tests, graceful shutdown) can wait
//! for them with [`BackgroundTasks::settle`].

use std::future::Future;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::metrics::DispatchMetrics;
use crate::store::SharedStore;

/// Spawns and tracks store tasks.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    handles: Mutex<Vec<JoinHandle<()>>>,
    metrics: DispatchMetrics,
}

impl BackgroundTasks {
    pub fn new(metrics: DispatchMetrics) -> Self {
        Self {
            handles: Mutex::new(Vec::new()),
            metrics,
        }
    }

    /// Evicts `keys` from `store` in the background.
    ///
    /// Outside a Tokio runtime nothing can be spawned; the request is logged
    /// and dropped.
    pub fn evict(&self, store: SharedStore, keys: Vec<String>) {
        let metrics = self.metrics.clone();
        let spawned = self.spawn(async move {
            for key in &keys {
                match store.evict(key).await {
                    Ok(()) => debug!(key = %key, store = store.name(), "Evicted"),
                    Err(e) => {
                        metrics.record_eviction_failure(store.name());
                        error!(key = %key, store = store.name(), error = %e, "Eviction failed");
                    },
                }
            }
        });

        if !spawned {
            warn!("No async runtime available, eviction skipped");
        }
    }

    /// Stores `value` under `key` in the background.
    pub fn write(&self, store: SharedStore, key: String, value: String) {
        let spawned = self.spawn(async move {
            if let Err(e) = store.set(&key, value).await {
                error!(key = %key, store = store.name(), error = %e, "Cache write failed");
            }
        });

        if !spawned {
            warn!("No async runtime available, cache write skipped");
        }
    }

    /// Waits for every task spawned so far.
    pub async fn settle(&self) {
        let pending = std::mem::take(&mut *self.handles.lock());
        for handle in pending {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background store task did not complete");
            }
        }
    }

    /// Number of tasks not yet known to be finished.
    pub fn in_flight(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            return false;
        };

        let handle = runtime.spawn(task);
        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
        true
    }
}
