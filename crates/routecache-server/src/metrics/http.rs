//! HTTP metrics middleware.

use std::time::Instant;

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};
use metrics::{counter, histogram};

use crate::middleware::CACHE_STATUS_HEADER;

const REQUESTS: &str = "routecache_http_requests_total";
const DURATION: &str = "routecache_http_request_duration_seconds";

/// Cache outcome of a response that never went through the cache layers.
const BYPASS: &str = "BYPASS";

/// Registra las metricas HTTP
pub fn register_http_metrics() {
    metrics::describe_counter!(REQUESTS, "HTTP requests by route, status and cache outcome");
    metrics::describe_histogram!(DURATION, "HTTP request duration in seconds by cache outcome");
}

/// Records request count and latency, labelled with the route template and
/// the `x-route-cache` outcome (HIT, MISS or BYPASS).
pub async fn http_metrics_middleware(
    matched_path: Option<MatchedPath>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().as_str().to_owned();
    // templates keep the label set bounded; unmatched requests share one label
    let route = matched_path
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;

    let outcome = response
        .headers()
        .get(CACHE_STATUS_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(BYPASS)
        .to_owned();

    histogram!(
        DURATION,
        "method" => method.clone(),
        "route" => route.clone(),
        "cache" => outcome.clone()
    )
    .record(start.elapsed().as_secs_f64());

    counter!(
        REQUESTS,
        "method" => method,
        "route" => route,
        "status" => response.status().as_u16().to_string(),
        "cache" => outcome
    )
    .increment(1);

    response
}
