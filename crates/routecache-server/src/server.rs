use std::net::SocketAddr;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware,
    routing::{delete, get, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{Span, info_span};

use crate::handlers::{
    cache::{list_routes, reset_cache},
    health::health_check,
    metrics::metrics_handler,
    records::{delete_record, get_record, list_records, put_record},
};
use crate::metrics::http::http_metrics_middleware;
use crate::middleware::{
    CacheLayerState, CacheRouteOptions, PublishOptions, cache_publisher, cache_subscriber,
};
use crate::state::AppState;

/// Collection address invalidated by every record write.
const RECORDS_COLLECTION: &str = "/records";

/// Creates the application router without the metrics endpoint.
pub fn create_router(state: AppState) -> Router {
    let cache = state.cache().clone();

    let subscriber = middleware::from_fn_with_state(
        CacheLayerState::new(cache.clone(), CacheRouteOptions::default()),
        cache_subscriber,
    );
    let publisher = middleware::from_fn_with_state(
        CacheLayerState::new(cache, PublishOptions::default().cascade(RECORDS_COLLECTION)),
        cache_publisher,
    );

    let middleware_stack = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(PropagateRequestIdLayer::x_request_id());

    Router::new()
        .route("/health", get(health_check))
        // Cached reads
        .route(
            RECORDS_COLLECTION,
            get(list_records).layer(subscriber.clone()),
        )
        .route(
            "/records/{id}",
            get(get_record).layer(subscriber).merge(
                put(put_record)
                    .delete(delete_record)
                    .layer(publisher),
            ),
        )
        // Cache administration
        .route("/cache", delete(reset_cache))
        .route("/cache/routes", get(list_routes))
        .with_state(state)
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(middleware_stack)
}

/// Creates the application router with the Prometheus endpoint.
pub fn create_router_with_metrics(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    // Router for metrics endpoint (different state)
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    create_router(state).merge(metrics_router)
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info_span!(
        "http_request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}

/// Runs the server until a shutdown signal arrives, then waits for
/// background store work to finish.
pub async fn run_server(
    addr: SocketAddr,
    state: AppState,
    prometheus_handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let cache = state.cache().clone();
    let app = create_router_with_metrics(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache.settle().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
