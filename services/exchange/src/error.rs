//! Error types for the exchange service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use catalog::CatalogError;
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;

/// Errors raised by the repositories, the request state machine and the
/// exchange facade
#[derive(Error, Debug)]
pub enum TradeError {
    /// Bad input, rejected before touching the catalog or the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catalog failure; `status` is set when the catalog answered non-2xx
    #[error("Upstream error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// No record matches the lookup
    #[error("Not found: {0}")]
    NotFound(String),

    /// The action is not allowed from the book's current state or by this actor
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// A conditional write lost a race; re-read and decide again
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<CatalogError> for TradeError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(msg) => TradeError::Validation(msg),
            CatalogError::Upstream { status, message } => TradeError::Upstream { status, message },
            CatalogError::Network(e) => TradeError::Upstream {
                status: None,
                message: format!("Catalog request failed: {}", e),
            },
        }
    }
}

/// Type alias for core results
pub type TradeResult<T> = Result<T, TradeError>;

/// Error type returned by the HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated, but acting on another user's resources
    #[error("Forbidden")]
    Forbidden,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid transition or lost race
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The catalog failed
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<TradeError> for ApiError {
    fn from(err: TradeError) -> Self {
        match err {
            TradeError::Validation(msg) => ApiError::BadRequest(msg),
            TradeError::Upstream {
                status: Some(status),
                message,
            } => ApiError::BadGateway(format!("Catalog returned {}: {}", status, message)),
            TradeError::Upstream {
                status: None,
                message,
            } => ApiError::BadGateway(message),
            TradeError::NotFound(msg) => ApiError::NotFound(msg),
            TradeError::InvalidTransition(msg) | TradeError::Conflict(msg) => {
                ApiError::Conflict(msg)
            }
            TradeError::Database(e) => ApiError::Database(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
