//! Error types for the cache service and its HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use routecache_core::RouteError;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by [`RouteCache`](crate::RouteCache) operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Subscription or syntax problem.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// The active store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The loader could not produce fresh data.
    #[error("failed to load fresh data for '{address}': {source}")]
    Load {
        address: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ServiceError {
    /// Returns true if the error comes from configuration rather than runtime state.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Route(e) if e.is_configuration_error())
    }
}

#[derive(Debug)]
pub enum AppError {
    /// Recurso no encontrado
    NotFound(String),

    /// Parametros invalidos
    BadRequest(String),

    /// Error interno
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("{} not found", what),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", msg),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                msg,
            ),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        if err.is_configuration_error() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}
