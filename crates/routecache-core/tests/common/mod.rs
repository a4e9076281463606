#![allow(dead_code)]
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use routecache_core::{Notification, RouteChannel, RouteSyntax};

/// Records every callback invocation by subscriber name.
#[derive(Clone, Default)]
pub struct Tally {
    calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl Tally {
    /// Returns a callback that records under `name`.
    pub fn hook(&self, name: &str) -> Box<dyn Fn(Notification<()>) + Send + Sync> {
        let calls = Arc::clone(&self.calls);
        let name = name.to_string();
        Box::new(move |n: Notification<()>| calls.lock().push((name.clone(), n.keys)))
    }

    pub fn total(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|(n, _)| n == name).count()
    }

    pub fn per_subscriber(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for (name, _) in self.calls.lock().iter() {
            *counts.entry(name.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn keys_of(&self, name: &str) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, keys)| keys.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Channel with the default `/`, `:` and `*` syntax.
pub fn channel() -> RouteChannel<()> {
    RouteChannel::new(RouteSyntax::default()).expect("default syntax is valid")
}

/// The users/news fixture: groups `/*` and `/users/:user_id`, literals
/// `/users/123`, `/users/124` and `/users/124/news/0`.
pub fn users_fixture(tally: &Tally) -> RouteChannel<()> {
    let channel = channel();
    channel.on_group("/*", tally.hook("root-glob")).unwrap();
    channel
        .on_group("/users/:user_id", tally.hook("user-group"))
        .unwrap();
    channel.on("/users/123", tally.hook("user-123"));
    channel.on("/users/124", tally.hook("user-124"));
    channel.on("/users/124/news/0", tally.hook("news-0"));
    channel
}

/// The publish sequence exercised against the fixture.
pub const SEQUENCE: [&str; 6] = [
    "/users/123",
    "/users/:user_id/news/:news_id",
    "/users/*/news/*",
    "/users/:user_id",
    "/*",
    "*",
];
