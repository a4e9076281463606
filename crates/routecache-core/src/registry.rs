//! Subscription registry.
//!
//! Holds the literal map (address to subscribers), the group map (pattern to
//! subscribers) and each subscriber's context. Both maps only grow; there is
//! no unsubscribe. Insertion order is preserved everywhere so dispatch order
//! follows registration order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::channel::Notification;
use crate::error::{Result, RouteError};
use crate::syntax::RouteSyntax;

/// Opaque handle identifying a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Builds a handle from its raw value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Callback invoked when a subscriber is notified.
pub type Callback<S> = Arc<dyn Fn(Notification<S>) + Send + Sync>;

/// Literal and group subscriptions plus per-subscriber context.
pub struct SubscriptionRegistry<S> {
    syntax: RouteSyntax,
    next_id: u64,
    callbacks: HashMap<SubscriberId, Callback<S>>,
    literals: IndexMap<String, IndexSet<SubscriberId>>,
    groups: IndexMap<String, IndexSet<SubscriberId>>,
    /// First address a subscriber was literally registered under. Set once.
    literal_context: HashMap<SubscriberId, String>,
    /// Every pattern a subscriber was group-registered under, in order.
    group_context: HashMap<SubscriberId, IndexSet<String>>,
}

impl<S> SubscriptionRegistry<S> {
    /// Creates an empty registry after validating the syntax.
    pub fn new(syntax: RouteSyntax) -> Result<Self> {
        syntax.validate()?;
        Ok(Self {
            syntax,
            next_id: 0,
            callbacks: HashMap::new(),
            literals: IndexMap::new(),
            groups: IndexMap::new(),
            literal_context: HashMap::new(),
            group_context: HashMap::new(),
        })
    }

    /// Returns the syntax used for matching.
    pub fn syntax(&self) -> &RouteSyntax {
        &self.syntax
    }

    /// Stores a callback and issues its handle. No subscription is made.
    pub fn register(&mut self, callback: Callback<S>) -> SubscriberId {
        self.next_id += 1;
        let id = SubscriberId(self.next_id);
        self.callbacks.insert(id, callback);
        id
    }

    /// Subscribes `id` to an exact address.
    ///
    /// The subscriber's literal context is the first address it was ever
    /// subscribed to; later subscriptions leave it untouched.
    pub fn subscribe_literal(&mut self, address: &str, id: SubscriberId) -> Result<()> {
        self.ensure_known(id)?;
        self.insert_literal(address, id);
        Ok(())
    }

    /// Registers a callback and subscribes it to an exact address in one step.
    pub fn register_literal(&mut self, address: &str, callback: Callback<S>) -> SubscriberId {
        let id = self.register(callback);
        self.insert_literal(address, id);
        id
    }

    /// Subscribes `id` to a group pattern.
    ///
    /// Fails without touching any state when the pattern mixes the parameter
    /// prefix with the glob character.
    pub fn subscribe_group(&mut self, pattern: &str, id: SubscriberId) -> Result<()> {
        self.ensure_known(id)?;

        self.syntax.check_group_pattern(pattern)?;

        self.group_context
            .entry(id)
            .or_default()
            .insert(pattern.to_string());

        self.groups
            .entry(pattern.to_string())
            .or_default()
            .insert(id);
        Ok(())
    }

    /// Returns true if the address names a group of resources.
    pub fn is_generic(&self, address: &str) -> bool {
        self.syntax.is_generic(address)
    }

    /// Returns true if either map has an entry for exactly this key.
    pub fn has_entry(&self, key: &str) -> bool {
        self.literals.contains_key(key) || self.groups.contains_key(key)
    }

    pub fn callback(&self, id: SubscriberId) -> Option<&Callback<S>> {
        self.callbacks.get(&id)
    }

    pub fn literal_subscribers(&self, address: &str) -> Option<&IndexSet<SubscriberId>> {
        self.literals.get(address)
    }

    pub fn group_subscribers(&self, pattern: &str) -> Option<&IndexSet<SubscriberId>> {
        self.groups.get(pattern)
    }

    /// Literal registrations in registration order.
    pub fn literals(&self) -> impl Iterator<Item = (&str, &IndexSet<SubscriberId>)> {
        self.literals.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Group registrations in registration order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &IndexSet<SubscriberId>)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn literal_context(&self, id: SubscriberId) -> Option<&str> {
        self.literal_context.get(&id).map(String::as_str)
    }

    /// Patterns the subscriber was group-registered under, or `None` for a
    /// pure literal subscriber.
    pub fn group_context(&self, id: SubscriberId) -> Option<&IndexSet<String>> {
        self.group_context.get(&id).filter(|patterns| !patterns.is_empty())
    }

    /// The pattern a group subscriber is considered registered under: the
    /// first one it was ever group-registered with.
    pub fn owner(&self, id: SubscriberId) -> Option<&str> {
        self.group_context(id)
            .and_then(|patterns| patterns.first())
            .map(String::as_str)
    }

    /// Number of registered subscribers, subscribed or not.
    pub fn subscriber_count(&self) -> usize {
        self.callbacks.len()
    }

    fn insert_literal(&mut self, address: &str, id: SubscriberId) {
        self.literal_context
            .entry(id)
            .or_insert_with(|| address.to_string());

        self.literals
            .entry(address.to_string())
            .or_default()
            .insert(id);
    }

    fn ensure_known(&self, id: SubscriberId) -> Result<()> {
        if self.callbacks.contains_key(&id) {
            Ok(())
        } else {
            Err(RouteError::UnknownSubscriber(id))
        }
    }
}

impl<S> fmt::Debug for SubscriptionRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("syntax", &self.syntax)
            .field("subscribers", &self.callbacks.len())
            .field("literals", &self.literals.keys().collect::<Vec<_>>())
            .field("groups", &self.groups.keys().collect::<Vec<_>>())
            .finish()
    }
}
