use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse, Json, Response},
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::session::{session_cookie, SessionToken};
use crate::config::AppConfig;
use crate::logic;
use crate::model::{Id, PricedCart, Product, Session};
use crate::store::traits::Store;
use crate::store::ProductCache;

/// Shared application state. The store is generic for testability;
/// the raw pool is carried alongside because the inventory importer
/// runs engine-specific DDL that has no place behind the store traits.
pub struct AppState<S> {
    pub store: S,
    pub pool: PgPool,
    pub cache: ProductCache,
    pub config: AppConfig,
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

pub type HandlerError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn internal_error(e: anyhow::Error) -> HandlerError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(&e.to_string())),
    )
}

/// Load the live (non-expired) session for a token, if any
pub(crate) async fn load_session<S: Store>(
    store: &S,
    token: &SessionToken,
) -> Result<Option<Session>, HandlerError> {
    let Some(token) = &token.0 else {
        return Ok(None);
    };

    match store.get_session(token).await {
        Ok(Some(session)) if !session.is_expired() => Ok(Some(session)),
        Ok(_) => Ok(None),
        Err(e) => Err(internal_error(e)),
    }
}

/// Get the session for the request, minting a fresh anonymous one when
/// the browser has none yet. The bool reports whether a cookie must be
/// set on the response.
pub(crate) async fn ensure_session<S: Store>(
    store: &S,
    token: &SessionToken,
) -> Result<(Session, bool), HandlerError> {
    if let Some(session) = load_session(store, token).await? {
        return Ok((session, false));
    }

    let session = logic::new_session(None, false);
    store
        .create_session(session.clone())
        .await
        .map_err(internal_error)?;
    Ok((session, true))
}

/// Require a logged-in customer; 401 otherwise
pub(crate) async fn require_customer<S: Store>(
    store: &S,
    token: &SessionToken,
) -> Result<(Session, Id), HandlerError> {
    match load_session(store, token).await? {
        Some(session) => match session.customer_id {
            Some(customer_id) => Ok((session, customer_id)),
            None => Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Please log in first")),
            )),
        },
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Please log in first")),
        )),
    }
}

/// Require a manager session; 403 otherwise
pub(crate) async fn require_admin<S: Store>(
    store: &S,
    token: &SessionToken,
) -> Result<Session, HandlerError> {
    match load_session(store, token).await? {
        Some(session) if session.is_admin => Ok(session),
        _ => Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Manager access required")),
        )),
    }
}

/// Attach a freshly issued session cookie when one was minted
pub(crate) fn with_optional_cookie<T: Serialize>(
    body: T,
    new_token: Option<&str>,
) -> Response {
    match new_token {
        Some(token) => (
            AppendHeaders([(SET_COOKIE, session_cookie(token))]),
            Json(body),
        )
            .into_response(),
        None => Json(body).into_response(),
    }
}

// ===== Catalog =====

pub async fn list_products<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ListResponse<Product>>, HandlerError> {
    // Serve the cached listing when fresh; the importer invalidates it
    // on a successful catalog swap
    if let Some(products) = state.cache.get().await {
        let total = products.len();
        return Ok(Json(ListResponse {
            items: products,
            total,
        }));
    }

    match state.store.list_products().await {
        Ok(products) => {
            state.cache.put(products.clone()).await;
            let total = products.len();
            Ok(Json(ListResponse {
                items: products,
                total,
            }))
        }
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn get_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<Id>,
) -> Result<Json<Product>, HandlerError> {
    match state.store.get_product(product_id).await {
        Ok(Some(product)) => Ok(Json(product)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Product not found")),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

// ===== Cart =====

#[derive(Debug, Deserialize)]
pub struct CartItemRequest {
    pub product_id: Id,
    pub quantity: i32,
}

async fn priced_cart_for<S: Store>(
    state: &AppState<S>,
    session_token: &str,
) -> Result<PricedCart, HandlerError> {
    let items = state
        .store
        .list_cart_items(session_token)
        .await
        .map_err(internal_error)?;
    let products: HashMap<Id, Product> = state
        .store
        .list_products()
        .await
        .map_err(internal_error)?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    Ok(logic::price_cart(&items, &products))
}

pub async fn get_cart<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
) -> Result<Json<PricedCart>, HandlerError> {
    match load_session(&state.store, &token).await? {
        Some(session) => Ok(Json(priced_cart_for(&state, &session.token).await?)),
        None => Ok(Json(PricedCart {
            items: Vec::new(),
            total: 0.0,
        })),
    }
}

pub async fn set_cart_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
    RequestJson(request): RequestJson<CartItemRequest>,
) -> Result<Response, HandlerError> {
    let (session, created) = ensure_session(&state.store, &token).await?;

    if request.quantity > 0 {
        match state.store.get_product(request.product_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err((
                    StatusCode::NOT_FOUND,
                    Json(ErrorResponse::new("Product not found")),
                ))
            }
            Err(e) => return Err(internal_error(e)),
        }
    }

    state
        .store
        .set_cart_item(&session.token, request.product_id, request.quantity)
        .await
        .map_err(internal_error)?;

    let cart = priced_cart_for(&state, &session.token).await?;
    Ok(with_optional_cookie(
        cart,
        created.then_some(session.token.as_str()),
    ))
}

pub async fn remove_cart_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
    Path(product_id): Path<Id>,
) -> Result<Json<PricedCart>, HandlerError> {
    match load_session(&state.store, &token).await? {
        Some(session) => {
            state
                .store
                .remove_cart_item(&session.token, product_id)
                .await
                .map_err(internal_error)?;
            Ok(Json(priced_cart_for(&state, &session.token).await?))
        }
        None => Ok(Json(PricedCart {
            items: Vec::new(),
            total: 0.0,
        })),
    }
}

pub async fn clear_cart<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
) -> Result<Json<PricedCart>, HandlerError> {
    if let Some(session) = load_session(&state.store, &token).await? {
        state
            .store
            .clear_cart(&session.token)
            .await
            .map_err(internal_error)?;
    }

    Ok(Json(PricedCart {
        items: Vec::new(),
        total: 0.0,
    }))
}
