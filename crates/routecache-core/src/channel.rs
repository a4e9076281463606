//! Publish/subscribe channel over route addresses.
//!
//! `publish` resolves subscribers in three buckets, each subscriber being
//! notified at most once per call:
//!
//! 1. the literal subscribers of exactly this address; when present, the
//!    group buckets are skipped;
//! 2. otherwise the group subscribers of exactly this pattern, plus (unless
//!    frozen) every literal address and every other group pattern matching
//!    it;
//! 3. the catch-all subscribers, when 1 or 2 found someone and the publish
//!    is not frozen.
//!
//! A generic address that resolves to nobody goes through the fallback path,
//! which matches it against literal registrations directly.
//!
//! Resolution happens under a read lock; callbacks run after the lock is
//! released, in resolution order.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::Result;
use crate::registry::{Callback, SubscriberId, SubscriptionRegistry};
use crate::syntax::RouteSyntax;

/// Payload handed to a subscriber.
#[derive(Debug, Clone)]
pub struct Notification<S> {
    /// The address the subscriber was reached through.
    pub address: String,
    /// Addresses and patterns relevant to this notification, usually the keys
    /// the subscriber should evict.
    pub keys: Vec<String>,
    /// Store handle supplied by the publisher.
    pub store: S,
}

/// One planned callback invocation.
struct Delivery<S> {
    callback: Callback<S>,
    address: String,
    keys: Vec<String>,
}

/// Ordered, per-subscriber set of deliveries for a single publish.
struct DispatchPlan<S> {
    deliveries: IndexMap<SubscriberId, Delivery<S>>,
}

impl<S> DispatchPlan<S> {
    fn new() -> Self {
        Self {
            deliveries: IndexMap::new(),
        }
    }

    /// Adds a delivery; a subscriber already planned gets the new keys merged
    /// into its existing delivery instead of a second call.
    fn deliver(&mut self, id: SubscriberId, callback: &Callback<S>, address: &str, keys: Vec<String>) {
        match self.deliveries.get_mut(&id) {
            Some(existing) => {
                for key in keys {
                    if !existing.keys.contains(&key) {
                        existing.keys.push(key);
                    }
                }
            },
            None => {
                self.deliveries.insert(
                    id,
                    Delivery {
                        callback: Arc::clone(callback),
                        address: address.to_string(),
                        keys,
                    },
                );
            },
        }
    }

    fn len(&self) -> usize {
        self.deliveries.len()
    }
}

/// Subscription registry plus the publish algorithm.
///
/// `S` is the store handle passed to every subscriber; the channel never
/// looks inside it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use routecache_core::{RouteChannel, RouteSyntax};
///
/// let channel: RouteChannel<()> = RouteChannel::new(RouteSyntax::default()).unwrap();
/// let hits = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&hits);
/// channel
///     .on_group("/users/:id", move |_| {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })
///     .unwrap();
///
/// channel.publish("/users/:id", false, &());
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
pub struct RouteChannel<S> {
    registry: RwLock<SubscriptionRegistry<S>>,
    syntax: RouteSyntax,
}

impl<S> RouteChannel<S> {
    /// Creates a channel with the given syntax.
    pub fn new(syntax: RouteSyntax) -> Result<Self> {
        Ok(Self {
            registry: RwLock::new(SubscriptionRegistry::new(syntax)?),
            syntax,
        })
    }

    /// Returns the syntax used by this channel.
    pub fn syntax(&self) -> &RouteSyntax {
        &self.syntax
    }

    /// Returns true if the address names a group of resources.
    pub fn is_generic(&self, address: &str) -> bool {
        self.syntax.is_generic(address)
    }

    /// Registers a callback without subscribing it anywhere.
    pub fn register<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(Notification<S>) + Send + Sync + 'static,
    {
        self.registry.write().register(Arc::new(callback))
    }

    /// Subscribes an existing subscriber to an exact address.
    pub fn subscribe(&self, address: &str, id: SubscriberId) -> Result<()> {
        self.registry.write().subscribe_literal(address, id)
    }

    /// Subscribes an existing subscriber to a group pattern.
    pub fn subscribe_group(&self, pattern: &str, id: SubscriberId) -> Result<()> {
        self.registry.write().subscribe_group(pattern, id)
    }

    /// Registers `callback` and subscribes it to an exact address.
    pub fn on<F>(&self, address: &str, callback: F) -> SubscriberId
    where
        F: Fn(Notification<S>) + Send + Sync + 'static,
    {
        self.registry
            .write()
            .register_literal(address, Arc::new(callback))
    }

    /// Registers `callback` and subscribes it to a group pattern.
    ///
    /// A mixed pattern is rejected before the callback is registered.
    pub fn on_group<F>(&self, pattern: &str, callback: F) -> Result<SubscriberId>
    where
        F: Fn(Notification<S>) + Send + Sync + 'static,
    {
        self.syntax.check_group_pattern(pattern)?;
        let mut registry = self.registry.write();
        let id = registry.register(Arc::new(callback));
        registry.subscribe_group(pattern, id)?;
        Ok(id)
    }

    /// Literal addresses currently registered, in registration order.
    pub fn literal_addresses(&self) -> Vec<String> {
        self.registry
            .read()
            .literals()
            .map(|(address, _)| address.to_string())
            .collect()
    }

    /// Group patterns currently registered, in registration order.
    pub fn group_patterns(&self) -> Vec<String> {
        self.registry
            .read()
            .groups()
            .map(|(pattern, _)| pattern.to_string())
            .collect()
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry.read().subscriber_count()
    }
}

impl<S: Clone> RouteChannel<S> {
    /// Broadcasts a change of `address` and returns how many callbacks ran.
    ///
    /// With `freeze` set only exact registrations are considered: no nested
    /// literal/group expansion, no catch-all, no fallback.
    pub fn publish(&self, address: &str, freeze: bool, store: &S) -> usize {
        let plan = {
            let registry = self.registry.read();
            plan_publish(&registry, address, freeze)
        };

        let notified = plan.len();
        debug!(address = %address, freeze, notified, "Dispatching publish");

        for (_, delivery) in plan.deliveries {
            (delivery.callback)(Notification {
                address: delivery.address,
                keys: delivery.keys,
                store: store.clone(),
            });
        }

        notified
    }
}

impl<S> std::fmt::Debug for RouteChannel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteChannel")
            .field("registry", &*self.registry.read())
            .finish()
    }
}

fn plan_publish<S>(registry: &SubscriptionRegistry<S>, address: &str, freeze: bool) -> DispatchPlan<S> {
    let targets = resolve_targets(registry, address, freeze);
    let mut plan = DispatchPlan::new();

    if targets.is_empty() {
        if registry.syntax().is_concrete(address) {
            warn!(address = %address, "Address has no subscribers attached to it");
        } else {
            notify(registry, None, address, freeze, &mut plan);
        }
    }

    for (id, reached_through) in targets {
        notify(registry, Some(id), &reached_through, freeze, &mut plan);
    }

    plan
}

/// Collects subscribers for `address`, each tagged with the registration key
/// it was first reached through.
fn resolve_targets<S>(
    registry: &SubscriptionRegistry<S>,
    address: &str,
    freeze: bool,
) -> IndexMap<SubscriberId, String> {
    let syntax = registry.syntax();
    let mut targets: IndexMap<SubscriberId, String> = IndexMap::new();

    let mut collect = |subscribers: &indexmap::IndexSet<SubscriberId>, key: &str| {
        for id in subscribers {
            targets.entry(*id).or_insert_with(|| key.to_string());
        }
    };

    if let Some(subscribers) = registry.literal_subscribers(address) {
        collect(subscribers, address);
    } else if let Some(subscribers) = registry.group_subscribers(address) {
        collect(subscribers, address);

        if !freeze {
            let is_child = |key: &str| {
                !syntax.is_catch_all(key) && key != address && syntax.matches(key, address)
            };

            for (key, subscribers) in registry.literals() {
                if is_child(key) {
                    collect(subscribers, key);
                }
            }
            for (key, subscribers) in registry.groups() {
                if is_child(key) {
                    collect(subscribers, key);
                }
            }
        }
    }

    if !freeze && !targets.is_empty() {
        let catch_all = syntax.catch_all();
        if let Some(subscribers) = registry.group_subscribers(&catch_all) {
            for id in subscribers {
                targets.entry(*id).or_insert_with(|| catch_all.clone());
            }
        }
    }

    targets
}

/// Plans the callback for one resolved subscriber.
///
/// `None` (or an address with no registration of its own) routes to the
/// fallback path unless the publish is frozen.
fn notify<S>(
    registry: &SubscriptionRegistry<S>,
    subscriber: Option<SubscriberId>,
    address: &str,
    freeze: bool,
    plan: &mut DispatchPlan<S>,
) {
    let id = match subscriber {
        Some(id) if registry.has_entry(address) => id,
        _ => {
            if !freeze {
                fallback(registry, address, plan);
            }
            return;
        },
    };

    let Some(callback) = registry.callback(id) else {
        return;
    };
    let syntax = registry.syntax();

    match (registry.group_context(id), registry.owner(id)) {
        (Some(patterns), Some(owner)) => {
            let mut keys: Vec<String> = patterns.iter().cloned().collect();
            keys.extend(
                registry
                    .literals()
                    .map(|(literal, _)| literal)
                    .filter(|literal| syntax.matches(literal, owner))
                    .map(str::to_string),
            );
            plan.deliver(id, callback, address, keys);
        },
        _ => {
            if syntax.is_generic(address) {
                warn!(
                    address = %address,
                    subscriber = %id,
                    "Generic address is not covered by any group context of the subscriber"
                );
                return;
            }

            let mut keys = vec![address.to_string()];
            keys.extend(registry.literal_context(id).map(str::to_string));
            plan.deliver(id, callback, address, keys);
        },
    }
}

/// Dispatch for a generic address nobody subscribed to directly.
///
/// Every literal registration matching the address is notified with
/// `[address, literal]`. When at least one matched, the catch-all
/// subscribers are notified too, since bucket 3 never runs on this path.
fn fallback<S>(registry: &SubscriptionRegistry<S>, address: &str, plan: &mut DispatchPlan<S>) {
    let syntax = registry.syntax();
    let is_catch_all = syntax.is_catch_all(address);
    let mut matched = 0usize;

    for (literal, subscribers) in registry.literals() {
        if !is_catch_all && !syntax.matches(literal, address) {
            continue;
        }
        matched += 1;

        for id in subscribers {
            if let Some(callback) = registry.callback(*id) {
                plan.deliver(
                    *id,
                    callback,
                    address,
                    vec![address.to_string(), literal.to_string()],
                );
            }
        }
    }

    if matched == 0 {
        warn!(address = %address, "Group address has no subscribers attached to it");
        return;
    }

    if !is_catch_all {
        let catch_all = syntax.catch_all();
        if let Some(subscribers) = registry.group_subscribers(&catch_all) {
            for id in subscribers {
                if let Some(callback) = registry.callback(*id) {
                    plan.deliver(
                        *id,
                        callback,
                        address,
                        vec![address.to_string(), catch_all.clone()],
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<(String, Vec<String>)>>>;

    fn channel() -> RouteChannel<()> {
        RouteChannel::new(RouteSyntax::default()).unwrap()
    }

    fn recorder(log: &Log, name: &'static str) -> Box<dyn Fn(Notification<()>) + Send + Sync> {
        let log = Arc::clone(log);
        Box::new(move |n: Notification<()>| log.lock().push((name.to_string(), n.keys)))
    }

    fn names(log: &Log) -> Vec<String> {
        log.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    #[test]
    fn test_literal_publish_passes_address_and_context() {
        let channel = channel();
        let log: Log = Arc::default();
        channel.on("/users/123", recorder(&log, "user"));

        assert_eq!(channel.publish("/users/123", false, &()), 1);

        let entries = log.lock().clone();
        assert_eq!(
            entries,
            vec![(
                "user".to_string(),
                vec!["/users/123".to_string(), "/users/123".to_string()]
            )]
        );
    }

    #[test]
    fn test_exact_literal_short_circuits_groups() {
        let channel = channel();
        let log: Log = Arc::default();
        channel.on("/users/123", recorder(&log, "literal"));
        channel.on_group("/users/:id", recorder(&log, "group")).unwrap();

        channel.publish("/users/123", false, &());

        assert_eq!(names(&log), vec!["literal"]);
    }

    #[test]
    fn test_group_keys_are_recomputed_at_call_time() {
        let channel = channel();
        let log: Log = Arc::default();
        channel.on_group("/users/:id", recorder(&log, "group")).unwrap();
        channel.on("/users/1", |_| {});

        channel.publish("/users/:id", false, &());
        channel.on("/users/2", |_| {});
        channel.publish("/users/:id", false, &());

        let entries = log.lock().clone();
        assert_eq!(entries[0].1, vec!["/users/:id", "/users/1"]);
        assert_eq!(entries[1].1, vec!["/users/:id", "/users/1", "/users/2"]);
    }

    #[test]
    fn test_owner_is_first_registered_pattern() {
        let channel = channel();
        let log: Log = Arc::default();
        let id = channel.register(recorder(&log, "multi"));
        channel.subscribe_group("/posts/:id", id).unwrap();
        channel.subscribe_group("/users/:id", id).unwrap();
        channel.on("/users/1", |_| {});
        channel.on("/posts/9", |_| {});

        channel.publish("/users/:id", false, &());

        let entries = log.lock().clone();
        assert_eq!(entries[0].1, vec!["/posts/:id", "/users/:id", "/posts/9"]);
    }

    #[test]
    fn test_freeze_skips_children_and_catch_all() {
        let channel = channel();
        let log: Log = Arc::default();
        channel.on_group("/users/:id", recorder(&log, "group")).unwrap();
        channel.on("/users/1", recorder(&log, "child"));
        channel.on_group("*", recorder(&log, "catch-all")).unwrap();

        assert_eq!(channel.publish("/users/:id", true, &()), 1);
        assert_eq!(names(&log), vec!["group"]);
    }

    #[test]
    fn test_frozen_unknown_group_address_is_silent() {
        let channel = channel();
        let log: Log = Arc::default();
        channel.on("/users/1", recorder(&log, "child"));

        assert_eq!(channel.publish("/users/*", true, &()), 0);
        assert_eq!(channel.publish("/users/*", false, &()), 1);
    }

    #[test]
    fn test_fallback_merges_keys_for_repeated_subscriber() {
        let channel = channel();
        let log: Log = Arc::default();
        let id = channel.register(recorder(&log, "both"));
        channel.subscribe("/users/1", id).unwrap();
        channel.subscribe("/users/2", id).unwrap();

        assert_eq!(channel.publish("/users/*", false, &()), 1);

        let entries = log.lock().clone();
        assert_eq!(entries[0].1, vec!["/users/*", "/users/1", "/users/2"]);
    }

    #[test]
    fn test_fallback_adds_catch_all_with_glob_key() {
        let channel = channel();
        let log: Log = Arc::default();
        channel.on("/users/1", recorder(&log, "child"));
        channel.on_group("*", recorder(&log, "catch-all")).unwrap();

        channel.publish("/users/:id", false, &());

        let entries = log.lock().clone();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], ("catch-all".to_string(), vec!["/users/:id".to_string(), "*".to_string()]));
    }

    #[test]
    fn test_generic_address_reaching_literal_subscriber_is_skipped() {
        let channel = channel();
        let log: Log = Arc::default();
        // literally subscribed to a generic-looking address
        channel.on("/users/:id", recorder(&log, "odd"));

        assert_eq!(channel.publish("/users/:id", false, &()), 0);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_callback_may_subscribe_during_publish() {
        let channel = Arc::new(channel());
        let inner = Arc::clone(&channel);
        channel.on("/users/1", move |_| {
            inner.on("/users/2", |_| {});
        });

        channel.publish("/users/1", false, &());

        assert_eq!(channel.literal_addresses(), vec!["/users/1", "/users/2"]);
    }
}
