//! Read-through cache middleware.

use axum::{
    body::{Body, to_bytes},
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use super::{CACHE_STATUS_HEADER, CacheLayerState, CacheRouteOptions, request_address};
use crate::error::AppError;
use crate::store::CachedResponse;

/// Serves GET requests from the store when possible.
///
/// On a miss the handler runs; a 2xx response is captured, encoded with the
/// service's codec and written to the store in the background. The request
/// address gets an evicting subscription the first time it is seen. Store
/// failures degrade to an uncached response.
pub async fn cache_subscriber(
    State(state): State<CacheLayerState<CacheRouteOptions>>,
    matched_path: Option<MatchedPath>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let cache = state.cache();
    let address = request_address(
        cache,
        state.options().catch_all,
        matched_path.as_ref(),
        request.uri(),
    );

    if let Err(e) = cache.ensure_subscribed(&address) {
        warn!(address = %address, error = %e, "Cannot subscribe route, serving uncached");
        return next.run(request).await;
    }

    match cache.read_cache(&address).await {
        Ok(Some(raw)) => match cache.codec().decode(&raw) {
            Ok(cached) => {
                cache.cache_metrics().record_hit();
                debug!(address = %address, "Serving cached response");
                return with_cache_status(cached.into_response(), "HIT");
            },
            Err(e) => warn!(address = %address, error = %e, "Discarding undecodable cache entry"),
        },
        Ok(None) => {},
        Err(e) => {
            warn!(address = %address, error = %e, "Cache read failed, serving uncached");
            return next.run(request).await;
        },
    }

    cache.cache_metrics().record_miss();
    let response = next.run(request).await;
    if !response.status().is_success() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(address = %address, error = %e, "Failed to buffer response body");
            return AppError::Internal("failed to read response body".to_string()).into_response();
        },
    };

    match CachedResponse::from_parts(&parts, &bytes).map(|cached| cache.codec().encode(&cached)) {
        Some(Ok(encoded)) => cache.write_cache_in_background(&address, encoded),
        Some(Err(e)) => warn!(address = %address, error = %e, "Failed to encode response"),
        None => debug!(address = %address, "Response body is not UTF-8, not cached"),
    }

    with_cache_status(Response::from_parts(parts, Body::from(bytes)), "MISS")
}

fn with_cache_status(mut response: Response, status: &'static str) -> Response {
    response.headers_mut().insert(
        HeaderName::from_static(CACHE_STATUS_HEADER),
        HeaderValue::from_static(status),
    );
    response
}
