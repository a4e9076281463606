//! Cache administration handlers.

use axum::{extract::State, response::Json};
use serde::Serialize;
use tracing::instrument;

use crate::error::AppError;
use crate::metrics::CacheStats;
use crate::state::AppState;

/// Response de DELETE /cache.
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: String,
}

/// Snapshot of the registered routes.
#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub literals: Vec<String>,
    pub groups: Vec<String>,
    pub subscribers: usize,
    pub in_flight: usize,
    pub stats: CacheStats,
}

/// DELETE /cache
/// Vacia el store y olvida las rutas suscritas.
#[instrument(skip_all)]
pub async fn reset_cache(State(state): State<AppState>) -> Result<Json<ResetResponse>, AppError> {
    state.cache().reset().await?;

    Ok(Json(ResetResponse {
        message: "Cache cleared".to_string(),
    }))
}

/// GET /cache/routes
pub async fn list_routes(State(state): State<AppState>) -> Json<RoutesResponse> {
    let cache = state.cache();
    let channel = cache.channel();

    Json(RoutesResponse {
        literals: channel.literal_addresses(),
        groups: channel.group_patterns(),
        subscribers: channel.subscriber_count(),
        in_flight: cache.in_flight(),
        stats: cache.cache_metrics().stats(),
    })
}
