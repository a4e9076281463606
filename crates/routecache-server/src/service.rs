//! Route-keyed cache service.
//!
//! [`RouteCache`] ties a [`RouteChannel`] to a [`CacheStore`]: reads install
//! an evicting subscription for the address they cache, and writes publish
//! the address they changed so every affected entry is dropped.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use routecache_core::{Notification, RouteChannel, RouteSyntax, SubscriberId};
use tracing::{debug, info, instrument};

use crate::background::BackgroundTasks;
use crate::error::ServiceError;
use crate::loader::{Loader, StaticLoader};
use crate::metrics::{CacheMetrics, DispatchMetrics};
use crate::store::{
    JsonCodec, MemoryStore, ResponseCodec, SharedCodec, SharedStore, StoreConfig,
};

/// Delay applied before loading fresh data on a miss.
pub const DEFAULT_FRESH_DATA_DELAY: Duration = Duration::from_millis(300);

/// Result of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The store already held a value for the address.
    Cached,
    /// The value was loaded and written back.
    Fresh(String),
}

impl ReadOutcome {
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached)
    }
}

/// Cache service keyed by route addresses.
///
/// Cloning is cheap; clones share the channel, the store and the
/// subscription bookkeeping.
///
/// # Examples
///
/// ```no_run
/// use routecache_server::{ReadOutcome, RouteCache};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), routecache_server::ServiceError> {
/// let cache = RouteCache::builder().build()?;
///
/// assert!(matches!(cache.get("/users/1").await?, ReadOutcome::Fresh(_)));
/// assert_eq!(cache.get("/users/1").await?, ReadOutcome::Cached);
///
/// cache.put("/users/:id");
/// cache.settle().await;
/// assert!(matches!(cache.get("/users/1").await?, ReadOutcome::Fresh(_)));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RouteCache {
    inner: Arc<Inner>,
}

struct Inner {
    channel: RouteChannel<SharedStore>,
    store: RwLock<SharedStore>,
    /// Addresses that already carry an evicting subscription.
    subscribed: Mutex<HashSet<String>>,
    loader: Arc<dyn Loader>,
    codec: SharedCodec,
    fresh_data_delay: Duration,
    tasks: Arc<BackgroundTasks>,
    cache_metrics: CacheMetrics,
    dispatch_metrics: DispatchMetrics,
}

impl RouteCache {
    /// Creates a builder with default settings.
    pub fn builder() -> RouteCacheBuilder {
        RouteCacheBuilder::default()
    }

    /// Returns the syntax addresses are interpreted with.
    pub fn syntax(&self) -> &RouteSyntax {
        self.inner.channel.syntax()
    }

    /// Returns true if the address names a group of resources.
    pub fn is_generic(&self, address: &str) -> bool {
        self.inner.channel.is_generic(address)
    }

    /// Returns the active store.
    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.inner.store.read())
    }

    /// Codec cached HTTP responses are stored with.
    pub fn codec(&self) -> &dyn ResponseCodec {
        self.inner.codec.as_ref()
    }

    /// Underlying channel, for introspection.
    pub fn channel(&self) -> &RouteChannel<SharedStore> {
        &self.inner.channel
    }

    pub fn cache_metrics(&self) -> &CacheMetrics {
        &self.inner.cache_metrics
    }

    pub fn dispatch_metrics(&self) -> &DispatchMetrics {
        &self.inner.dispatch_metrics
    }

    /// Replaces the store, cleaning up the outgoing one first.
    ///
    /// Background work already queued against the outgoing store finishes
    /// before it is cleaned. If the cleanup fails the old store stays active.
    pub async fn configure<F>(&self, factory: F) -> Result<(), ServiceError>
    where
        F: FnOnce() -> SharedStore,
    {
        self.inner.tasks.settle().await;
        let outgoing = self.store();
        outgoing.cleanup().await?;

        let incoming = factory();
        info!(from = outgoing.name(), to = incoming.name(), "Cache store replaced");
        *self.inner.store.write() = incoming;
        Ok(())
    }

    /// Forgets which addresses were subscribed and empties the store.
    ///
    /// Pending background writes land before the store is emptied.
    /// Subscriptions already registered on the channel stay in place.
    pub async fn reset(&self) -> Result<(), ServiceError> {
        let forgotten = {
            let mut subscribed = self.inner.subscribed.lock();
            let count = subscribed.len();
            subscribed.clear();
            count
        };

        self.inner.tasks.settle().await;
        self.store().cleanup().await?;
        info!(forgotten, "Cache reset");
        Ok(())
    }

    /// Reads an address, subscribing it for eviction first.
    #[instrument(skip(self))]
    pub async fn get(&self, address: &str) -> Result<ReadOutcome, ServiceError> {
        let address = self.syntax().normalize(address);
        self.ensure_subscribed(address)?;
        self.read(address).await
    }

    /// Returns the stored value, or loads, stores and returns fresh data.
    pub async fn read(&self, address: &str) -> Result<ReadOutcome, ServiceError> {
        let start = Instant::now();

        if self.read_cache(address).await?.is_some() {
            self.inner.cache_metrics.record_hit();
            self.inner
                .cache_metrics
                .record_operation_duration("read_hit", start.elapsed());
            debug!(address = %address, "Cache hit");
            return Ok(ReadOutcome::Cached);
        }

        self.inner.cache_metrics.record_miss();
        tokio::time::sleep(self.inner.fresh_data_delay).await;

        let data = self
            .inner
            .loader
            .load(address)
            .await
            .map_err(|source| ServiceError::Load {
                address: address.to_string(),
                source,
            })?;

        self.write_cache(address, data.clone()).await?;
        self.inner
            .cache_metrics
            .record_operation_duration("read_miss", start.elapsed());
        debug!(address = %address, "Cache miss, fresh data stored");
        Ok(ReadOutcome::Fresh(data))
    }

    /// Reads the active store directly.
    pub async fn read_cache(&self, address: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.store().get(address).await?)
    }

    /// Writes the active store directly.
    pub async fn write_cache(&self, address: &str, value: String) -> Result<(), ServiceError> {
        Ok(self.store().set(address, value).await?)
    }

    /// Writes the active store without waiting. Failures are logged.
    pub fn write_cache_in_background(&self, address: &str, value: String) {
        self.inner
            .tasks
            .write(self.store(), address.to_string(), value);
    }

    /// Broadcasts a creation at `address`.
    pub fn post(&self, address: &str) -> usize {
        self.publish(address, false)
    }

    /// Broadcasts an update at `address`.
    pub fn put(&self, address: &str) -> usize {
        self.publish(address, false)
    }

    /// Broadcasts a removal at `address`.
    pub fn delete(&self, address: &str) -> usize {
        self.publish(address, false)
    }

    /// Publishes `address` and returns how many subscribers were notified.
    ///
    /// Evictions run in the background; use [`settle`](Self::settle) to wait
    /// for them.
    pub fn publish(&self, address: &str, freeze: bool) -> usize {
        let address = self.syntax().normalize(address);
        let store = self.store();
        let notified = self.inner.channel.publish(address, freeze, &store);

        self.inner
            .dispatch_metrics
            .record_publish(self.is_generic(address), freeze, notified);
        debug!(address = %address, freeze, notified, "Published");
        notified
    }

    /// Subscribes a custom callback to an exact address.
    pub fn subscribe_literal<F>(&self, address: &str, callback: F) -> SubscriberId
    where
        F: Fn(Notification<SharedStore>) + Send + Sync + 'static,
    {
        let address = self.syntax().normalize(address);
        self.inner.channel.on(address, callback)
    }

    /// Subscribes a custom callback to a group pattern.
    pub fn subscribe_group<F>(&self, pattern: &str, callback: F) -> Result<SubscriberId, ServiceError>
    where
        F: Fn(Notification<SharedStore>) + Send + Sync + 'static,
    {
        let pattern = self.syntax().normalize(pattern);
        Ok(self.inner.channel.on_group(pattern, callback)?)
    }

    /// Installs the evicting subscription for `address` once.
    ///
    /// Returns true if a subscription was added by this call.
    pub fn ensure_subscribed(&self, address: &str) -> Result<bool, ServiceError> {
        let address = self.syntax().normalize(address);
        let mut subscribed = self.inner.subscribed.lock();
        if subscribed.contains(address) {
            return Ok(false);
        }

        let handler = evicting_handler(Arc::clone(&self.inner.tasks));
        if self.is_generic(address) {
            self.inner.channel.on_group(address, handler)?;
        } else {
            self.inner.channel.on(address, handler);
        }

        subscribed.insert(address.to_string());
        debug!(address = %address, "Evicting subscription installed");
        Ok(true)
    }

    /// Waits for every background eviction and write spawned so far.
    pub async fn settle(&self) {
        self.inner.tasks.settle().await;
    }

    /// Background store tasks not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.tasks.in_flight()
    }
}

impl std::fmt::Debug for RouteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteCache")
            .field("channel", &self.inner.channel)
            .field("store", &self.store().name())
            .field("codec", &self.inner.codec.name())
            .field("fresh_data_delay", &self.inner.fresh_data_delay)
            .finish()
    }
}

/// Callback that evicts every notified key from the notified store.
fn evicting_handler(
    tasks: Arc<BackgroundTasks>,
) -> impl Fn(Notification<SharedStore>) + Send + Sync + 'static {
    move |notification| tasks.evict(notification.store, notification.keys)
}

type StoreFactory = Box<dyn FnOnce() -> SharedStore + Send>;

/// Builder for [`RouteCache`].
pub struct RouteCacheBuilder {
    syntax: RouteSyntax,
    store_factory: Option<StoreFactory>,
    memory_config: StoreConfig,
    loader: Option<Arc<dyn Loader>>,
    codec: SharedCodec,
    fresh_data_delay: Duration,
}

impl Default for RouteCacheBuilder {
    fn default() -> Self {
        Self {
            syntax: RouteSyntax::default(),
            store_factory: None,
            memory_config: StoreConfig::default(),
            loader: None,
            codec: Arc::new(JsonCodec),
            fresh_data_delay: DEFAULT_FRESH_DATA_DELAY,
        }
    }
}

impl RouteCacheBuilder {
    /// Sets the address syntax.
    pub fn syntax(mut self, syntax: RouteSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Sets the factory producing the initial store.
    pub fn store<F>(mut self, factory: F) -> Self
    where
        F: FnOnce() -> SharedStore + Send + 'static,
    {
        self.store_factory = Some(Box::new(factory));
        self
    }

    /// Uses an in-memory store with the given configuration.
    ///
    /// The store reports into the service's cache metrics.
    pub fn memory_store(mut self, config: StoreConfig) -> Self {
        self.store_factory = None;
        self.memory_config = config;
        self
    }

    /// Sets the loader used on a miss.
    pub fn loader<L>(mut self, loader: L) -> Self
    where
        L: Loader + 'static,
    {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Sets the codec HTTP responses are stored with (JSON by default).
    pub fn codec<C>(mut self, codec: C) -> Self
    where
        C: ResponseCodec + 'static,
    {
        self.codec = Arc::new(codec);
        self
    }

    /// Sets the delay applied before loading fresh data.
    pub fn fresh_data_delay(mut self, delay: Duration) -> Self {
        self.fresh_data_delay = delay;
        self
    }

    /// Builds the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the syntax is invalid.
    pub fn build(self) -> Result<RouteCache, ServiceError> {
        let channel = RouteChannel::new(self.syntax)?;
        let cache_metrics = CacheMetrics::new();
        let store: SharedStore = match self.store_factory {
            Some(factory) => factory(),
            None => Arc::new(MemoryStore::with_metrics(
                self.memory_config,
                cache_metrics.clone(),
            )),
        };
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(StaticLoader::default()));
        let dispatch_metrics = DispatchMetrics::new();

        info!(
            store = store.name(),
            codec = self.codec.name(),
            syntax = ?self.syntax,
            "Route cache ready"
        );

        Ok(RouteCache {
            inner: Arc::new(Inner {
                channel,
                store: RwLock::new(store),
                subscribed: Mutex::new(HashSet::new()),
                loader,
                codec: self.codec,
                fresh_data_delay: self.fresh_data_delay,
                tasks: Arc::new(BackgroundTasks::new(dispatch_metrics.clone())),
                cache_metrics,
                dispatch_metrics,
            }),
        })
    }
}
