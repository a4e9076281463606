mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Router,
    extract::Path,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use routecache_server::RouteCache;
use routecache_server::middleware::{
    CacheLayerState, CacheRouteOptions, PublishOptions, cache_publisher, cache_subscriber,
};
use routecache_server::store::{CachedResponse, ResponseCodec, StoreError};

use helpers::{FailingStore, TestClient};

fn cache() -> RouteCache {
    RouteCache::builder()
        .fresh_data_delay(Duration::ZERO)
        .build()
        .unwrap()
}

/// Router with a counting `/users/{id}` handler behind the subscriber.
fn users_router(cache: RouteCache, options: CacheRouteOptions, calls: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/users/{id}",
        get(move |Path(id): Path<String>| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                format!("user {id}")
            }
        })
        .layer(from_fn_with_state(
            CacheLayerState::new(cache, options),
            cache_subscriber,
        )),
    )
}

#[tokio::test]
async fn catch_all_subscribes_route_template() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let client = TestClient::new(users_router(
        cache.clone(),
        CacheRouteOptions { catch_all: true },
        Arc::clone(&calls),
    ));

    assert_eq!(client.get("/users/1").await.text(), "user 1");
    cache.settle().await;

    // every id shares the template entry
    let second = client.get("/users/2").await;
    assert_eq!(second.cache_status(), Some("HIT"));
    assert_eq!(second.text(), "user 1");
    assert_eq!(cache.channel().group_patterns(), vec!["/users/:id"]);

    assert_eq!(cache.put("/users/:id"), 1);
    cache.settle().await;

    let third = client.get("/users/3").await;
    assert_eq!(third.cache_status(), Some("MISS"));
    assert_eq!(third.text(), "user 3");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn group_publish_evicts_concrete_entries() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let client = TestClient::new(users_router(
        cache.clone(),
        CacheRouteOptions::default(),
        Arc::clone(&calls),
    ));

    client.get("/users/1").await;
    client.get("/users/2").await;
    cache.settle().await;
    assert_eq!(client.get("/users/1").await.cache_status(), Some("HIT"));

    assert_eq!(cache.publish("/users/*", false), 2);
    cache.settle().await;

    assert_eq!(client.get("/users/1").await.cache_status(), Some("MISS"));
    assert_eq!(client.get("/users/2").await.cache_status(), Some("MISS"));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn store_failure_serves_uncached() {
    let cache = RouteCache::builder()
        .store(|| Arc::new(FailingStore))
        .build()
        .unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let client = TestClient::new(users_router(
        cache.clone(),
        CacheRouteOptions::default(),
        Arc::clone(&calls),
    ));

    let first = client.get("/users/1").await;
    let second = client.get("/users/1").await;

    first.assert_status(StatusCode::OK);
    assert_eq!(second.text(), "user 1");
    assert_eq!(first.cache_status(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn publisher_uses_template_and_cascade() {
    let cache = cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let reader = TestClient::new(users_router(
        cache.clone(),
        CacheRouteOptions::default(),
        Arc::clone(&calls),
    ));
    let writer = TestClient::new(Router::new().route(
        "/users/{id}/rename",
        post(|| async { StatusCode::ACCEPTED }).layer(from_fn_with_state(
            CacheLayerState::new(
                cache.clone(),
                PublishOptions {
                    catch_all: true,
                    ..PublishOptions::default()
                }
                .cascade("/users/1"),
            ),
            cache_publisher,
        )),
    ));

    reader.get("/users/1").await;
    cache.settle().await;

    // "/users/:id/rename" reaches nobody; the cascade evicts "/users/1"
    let response = writer.post("/users/9/rename").await;
    response.assert_status(StatusCode::ACCEPTED);
    cache.settle().await;

    assert_eq!(reader.get("/users/1").await.cache_status(), Some("MISS"));
}

/// Stores `status|body`, dropping headers.
struct PipeCodec;

impl ResponseCodec for PipeCodec {
    fn encode(&self, response: &CachedResponse) -> Result<String, StoreError> {
        Ok(format!("{}|{}", response.status, response.body))
    }

    fn decode(&self, raw: &str) -> Result<CachedResponse, StoreError> {
        let (status, body) = raw
            .split_once('|')
            .ok_or_else(|| StoreError::codec("missing separator"))?;
        let status = status
            .parse()
            .map_err(|_| StoreError::codec("status is not a number"))?;
        Ok(CachedResponse::new(status, body))
    }

    fn name(&self) -> &str {
        "pipe"
    }
}

fn pipe_cache() -> RouteCache {
    RouteCache::builder()
        .fresh_data_delay(Duration::ZERO)
        .codec(PipeCodec)
        .build()
        .unwrap()
}

#[tokio::test]
async fn custom_codec_shapes_stored_entries() {
    let cache = pipe_cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let client = TestClient::new(users_router(
        cache.clone(),
        CacheRouteOptions::default(),
        Arc::clone(&calls),
    ));

    assert_eq!(client.get("/users/1").await.cache_status(), Some("MISS"));
    cache.settle().await;

    assert_eq!(
        cache.read_cache("/users/1").await.unwrap(),
        Some("200|user 1".to_string())
    );

    let hit = client.get("/users/1").await;
    assert_eq!(hit.cache_status(), Some("HIT"));
    assert_eq!(hit.text(), "user 1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.codec().name(), "pipe");
}

#[tokio::test]
async fn undecodable_entry_is_served_fresh() {
    let cache = pipe_cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let client = TestClient::new(users_router(
        cache.clone(),
        CacheRouteOptions::default(),
        Arc::clone(&calls),
    ));
    cache
        .write_cache("/users/1", r#"{"status":200,"body":"json"}"#.to_string())
        .await
        .unwrap();

    let response = client.get("/users/1").await;

    assert_eq!(response.cache_status(), Some("MISS"));
    assert_eq!(response.text(), "user 1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
