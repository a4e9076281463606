//! Middleware que conecta rutas HTTP con el cache.
//!
//! - [`cache_subscriber`]: serves GET responses from the store and stores
//!   fresh ones under the request address.
//! - [`cache_publisher`]: publishes the request address (and any cascade
//!   addresses) after a successful write.
//!
//! Both are plain async functions meant for
//! `axum::middleware::from_fn_with_state` with a [`CacheLayerState`].
//! HTTP paths are always `/`-delimited, so the route syntax used with these
//! adapters should keep the default delimiter.

mod publisher;
mod subscriber;

use std::sync::Arc;

use axum::extract::MatchedPath;
use axum::http::Uri;
use routecache_core::RouteSyntax;

use crate::RouteCache;

pub use publisher::cache_publisher;
pub use subscriber::cache_subscriber;

/// Response header telling whether the body came from the store.
pub const CACHE_STATUS_HEADER: &str = "x-route-cache";

/// Options for [`cache_subscriber`].
#[derive(Debug, Clone, Default)]
pub struct CacheRouteOptions {
    /// Subscribe to the matched route template instead of the concrete path.
    pub catch_all: bool,
}

/// Options for [`cache_publisher`].
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Publish the matched route template instead of the concrete path.
    pub catch_all: bool,
    /// Extra addresses published after the request address.
    pub cascade: Vec<String>,
    /// Restrict dispatch to exact registrations.
    pub freeze: bool,
}

impl PublishOptions {
    /// Adds a cascade address.
    pub fn cascade(mut self, address: impl Into<String>) -> Self {
        self.cascade.push(address.into());
        self
    }

    pub fn frozen(mut self) -> Self {
        self.freeze = true;
        self
    }
}

/// State handed to the cache middleware.
pub struct CacheLayerState<O> {
    cache: RouteCache,
    options: Arc<O>,
}

impl<O> CacheLayerState<O> {
    pub fn new(cache: RouteCache, options: O) -> Self {
        Self {
            cache,
            options: Arc::new(options),
        }
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    pub fn options(&self) -> &O {
        &self.options
    }
}

impl<O> Clone for CacheLayerState<O> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            options: Arc::clone(&self.options),
        }
    }
}

/// Address a request is cached or published under.
fn request_address(
    cache: &RouteCache,
    catch_all: bool,
    matched_path: Option<&MatchedPath>,
    uri: &Uri,
) -> String {
    let raw = match (catch_all, matched_path) {
        (true, Some(matched)) => route_pattern(matched.as_str(), cache.syntax()),
        _ => uri.path().to_string(),
    };
    cache.syntax().normalize(&raw).to_string()
}

/// Converts an axum route template into a group pattern.
///
/// `{name}` becomes a parameter segment and `{*rest}` becomes the glob.
///
/// ```
/// use routecache_core::RouteSyntax;
/// use routecache_server::middleware::route_pattern;
///
/// let syntax = RouteSyntax::default();
/// assert_eq!(route_pattern("/users/{id}/news", &syntax), "/users/:id/news");
/// assert_eq!(route_pattern("/files/{*path}", &syntax), "/files/*");
/// ```
pub fn route_pattern(template: &str, syntax: &RouteSyntax) -> String {
    template
        .split('/')
        .map(|segment| {
            match segment
                .strip_prefix('{')
                .and_then(|inner| inner.strip_suffix('}'))
            {
                Some(name) if name.starts_with('*') => syntax.glob.to_string(),
                Some(name) => format!("{}{}", syntax.param_prefix, name),
                None => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
