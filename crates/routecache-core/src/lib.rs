//! # RouteCache Core
//!
//! Route-addressed publish/subscribe used to invalidate cached responses.
//!
//! Cache keys are hierarchical addresses such as `/users/123`. Readers
//! subscribe to the address they cached (or to a group pattern such as
//! `/users/:id` or `/users/*`); writers publish the address they changed and
//! every matching subscriber is told which keys to drop.
//!
//! ## Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use routecache_core::{RouteChannel, RouteSyntax};
//!
//! let channel: RouteChannel<()> = RouteChannel::new(RouteSyntax::default()).unwrap();
//! let evicted = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&evicted);
//! channel.on("/users/124/news/0", move |notification| {
//!     sink.lock().unwrap().extend(notification.keys);
//! });
//!
//! // nobody subscribed to the glob itself, it is matched against literals
//! channel.publish("/users/*/news/*", false, &());
//!
//! assert_eq!(
//!     *evicted.lock().unwrap(),
//!     vec!["/users/*/news/*".to_string(), "/users/124/news/0".to_string()]
//! );
//! ```

pub mod channel;
pub mod error;
pub mod matcher;
pub mod registry;
pub mod syntax;

// Re-exports
pub use channel::{Notification, RouteChannel};
pub use error::{Result, RouteError};
pub use registry::{Callback, SubscriberId, SubscriptionRegistry};
pub use syntax::RouteSyntax;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
