//! Publish-on-write middleware.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::{CacheLayerState, PublishOptions, request_address};

/// Publishes the request address after a successful (2xx) response.
///
/// Cascade addresses are published afterwards, in order, with the same
/// freeze flag.
pub async fn cache_publisher(
    State(state): State<CacheLayerState<PublishOptions>>,
    matched_path: Option<MatchedPath>,
    request: Request,
    next: Next,
) -> Response {
    let cache = state.cache();
    let options = state.options();
    let address = request_address(
        cache,
        options.catch_all,
        matched_path.as_ref(),
        request.uri(),
    );

    let response = next.run(request).await;
    if !response.status().is_success() {
        return response;
    }

    let mut notified = cache.publish(&address, options.freeze);
    for cascade in &options.cascade {
        notified += cache.publish(cascade, options.freeze);
    }

    debug!(
        address = %address,
        cascade = ?options.cascade,
        notified,
        "Published after write"
    );
    response
}
