//! Exchange service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::{AuthUser, auth_middleware},
    models::{CatalogBook, ProfileUpdate, SearchRequest},
};

/// Create the router for the exchange service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/search", post(search_books))
        .route("/books", post(create_book))
        .route("/books/:id", delete(delete_book))
        .route(
            "/books/:id/request",
            post(request_book)
                .put(accept_request)
                .patch(deny_request)
                .delete(cancel_request),
        )
        .route("/me", get(current_user))
        .route("/users/:id", get(get_user).post(update_user))
        .route("/users/:id/books", get(get_user_books))
        .route("/users/:id/trades", get(get_user_trades))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/books", get(list_books))
        .route("/books/:id", get(get_book))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = state.exchange.health().await.unwrap_or(false);
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "unavailable" },
            "service": "exchange-service"
        })),
    )
}

/// Search the catalog and store the results
pub async fn search_books(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> ApiResult<impl IntoResponse> {
    let books = state
        .exchange
        .perform_search(&payload.query)
        .await
        .map_err(|e| {
            tracing::error!("Failed to search books: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(books))
}

/// Get all books
pub async fn list_books(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let books = state.exchange.list_books().await.map_err(|e| {
        tracing::error!("Failed to list books: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(books))
}

/// Get a book by ID
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let book = state.exchange.get_book(&id).await.map_err(|e| {
        tracing::error!("Failed to get book: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(book))
}

/// Store a book and add it to the caller's collection
pub async fn create_book(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CatalogBook>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .exchange
        .create_or_update_from_payload(&payload)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store book: {}", e);
            ApiError::from(e)
        })?;

    let book = state
        .exchange
        .claim_book(&book.id, user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to claim book: {}", e);
            ApiError::from(e)
        })?;

    Ok((StatusCode::CREATED, Json(book)))
}

/// Delete one of the caller's books
pub async fn delete_book(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.exchange.delete_book(&id, user.id).await.map_err(|e| {
        tracing::error!("Failed to delete book: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(json!({"message": "Book deleted successfully"})))
}

/// Request a book from its owner
pub async fn request_book(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let book = state.exchange.request_book(&id, user.id).await.map_err(|e| {
        tracing::error!("Failed to request book: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(book))
}

/// Accept the pending request on one of the caller's books
pub async fn accept_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .exchange
        .accept_request(&id, user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to accept request: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(book))
}

/// Deny the pending request on one of the caller's books
pub async fn deny_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let book = state.exchange.deny_request(&id, user.id).await.map_err(|e| {
        tracing::error!("Failed to deny request: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(book))
}

/// Withdraw the caller's own request
pub async fn cancel_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .exchange
        .cancel_request(&id, user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to cancel request: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(book))
}

/// Get the authenticated user
pub async fn current_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let user = state.exchange.get_user(user.id).await.map_err(|e| {
        tracing::error!("Failed to get current user: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(user))
}

/// Get a user by ID
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = state.exchange.get_user(id).await.map_err(|e| {
        tracing::error!("Failed to get user: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(user))
}

/// Update the caller's city and state
pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    if id != user.id {
        return Err(ApiError::Forbidden);
    }

    let user = state
        .exchange
        .update_user_profile(id, &payload)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update user profile: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(user))
}

/// Get the books a user owns
pub async fn get_user_books(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let books = state.exchange.books_owned_by(id).await.map_err(|e| {
        tracing::error!("Failed to get user books: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(books))
}

/// Get the caller's open trades
pub async fn get_user_trades(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if id != user.id {
        return Err(ApiError::Forbidden);
    }

    let trades = state.exchange.trades_for(id).await.map_err(|e| {
        tracing::error!("Failed to get trades: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(trades))
}
