use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::handlers::{
    ensure_session, internal_error, require_admin, with_optional_cookie, AppState, ErrorResponse,
    HandlerError, ListResponse,
};
use crate::api::session::SessionToken;
use crate::logic::{self, ImportError, ImportReport};
use crate::model::{Id, Order, OrderStatus, OrderView, Product, ProductUpdate};
use crate::store::traits::Store;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
}

/// Manager login: one shared password from configuration, no staff
/// accounts. Success flips the admin flag on the caller's session.
pub async fn admin_login<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
    RequestJson(request): RequestJson<AdminLoginRequest>,
) -> Result<Response, HandlerError> {
    if request.password != state.config.admin.password {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid manager password")),
        ));
    }

    let (session, created) = ensure_session(&state.store, &token).await?;
    state
        .store
        .update_session(&session.token, session.customer_id, true)
        .await
        .map_err(internal_error)?;

    log::info!("manager session opened");
    Ok(with_optional_cookie(
        serde_json::json!({"admin": true}),
        created.then_some(session.token.as_str()),
    ))
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub include_archived: Option<bool>,
}

pub async fn list_orders<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ListResponse<OrderView>>, HandlerError> {
    require_admin(&state.store, &token).await?;

    let orders: Vec<Order> = state
        .store
        .list_orders(query.include_archived.unwrap_or(false))
        .await
        .map_err(internal_error)?;

    let mut views = Vec::with_capacity(orders.len());
    for order in orders {
        views.push(
            logic::order_view(&state.store, order)
                .await
                .map_err(internal_error)?,
        );
    }

    let total = views.len();
    Ok(Json(ListResponse {
        items: views,
        total,
    }))
}

async fn transition_order<S: Store>(
    state: &AppState<S>,
    token: &SessionToken,
    order_id: Id,
    status: OrderStatus,
) -> Result<Json<OrderView>, HandlerError> {
    require_admin(&state.store, token).await?;

    let updated = state
        .store
        .set_order_status(order_id, status)
        .await
        .map_err(internal_error)?;
    if !updated {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Order not found")),
        ));
    }

    log::info!("order {} -> {}", order_id, status.as_str());

    match state.store.get_order(order_id).await {
        Ok(Some(order)) => {
            let view = logic::order_view(&state.store, order)
                .await
                .map_err(internal_error)?;
            Ok(Json(view))
        }
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Order not found")),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn approve_order<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
    Path(order_id): Path<Id>,
) -> Result<Json<OrderView>, HandlerError> {
    transition_order(&state, &token, order_id, OrderStatus::Approved).await
}

pub async fn reject_order<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
    Path(order_id): Path<Id>,
) -> Result<Json<OrderView>, HandlerError> {
    transition_order(&state, &token, order_id, OrderStatus::Rejected).await
}

#[derive(Debug, Serialize)]
pub struct ArchiveResponse {
    pub order_id: Id,
    pub archived: bool,
}

pub async fn toggle_archive_order<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
    Path(order_id): Path<Id>,
) -> Result<Json<ArchiveResponse>, HandlerError> {
    require_admin(&state.store, &token).await?;

    match state.store.toggle_order_archived(order_id).await {
        Ok(Some(archived)) => Ok(Json(ArchiveResponse { order_id, archived })),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Order not found")),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn admin_list_products<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
) -> Result<Json<ListResponse<Product>>, HandlerError> {
    require_admin(&state.store, &token).await?;

    // The portal always reads the table directly, bypassing the cache
    match state.store.list_products().await {
        Ok(products) => {
            let total = products.len();
            Ok(Json(ListResponse {
                items: products,
                total,
            }))
        }
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn update_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
    Path(product_id): Path<Id>,
    RequestJson(update): RequestJson<ProductUpdate>,
) -> Result<Json<Product>, HandlerError> {
    require_admin(&state.store, &token).await?;

    if let Some(price) = update.price {
        if price < 0.0 {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Price cannot be negative")),
            ));
        }
    }

    match state.store.update_product(product_id, update).await {
        Ok(Some(product)) => {
            state.cache.invalidate().await;
            Ok(Json(product))
        }
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Product not found")),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// Run the inventory importer against the configured feed file.
///
/// The storefront is never exposed to a half-migrated catalog: the
/// importer does all its work inside one transaction and the cache is
/// invalidated only after a successful swap. Errors report the failed
/// stage in plain text.
pub async fn reload_inventory<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
) -> Result<Json<ImportReport>, HandlerError> {
    require_admin(&state.store, &token).await?;

    match logic::run_import(&state.pool, &state.cache, &state.config.inventory.feed_path).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err(import_error_response(e)),
    }
}

fn import_error_response(e: ImportError) -> HandlerError {
    let status = match &e {
        ImportError::FeedNotFound(_) => StatusCode::NOT_FOUND,
        ImportError::FeedMalformed(_) => StatusCode::BAD_REQUEST,
        ImportError::ForeignReferenceConflict(_) | ImportError::ImportInProgress => {
            StatusCode::CONFLICT
        }
        ImportError::SwapFailed(_) | ImportError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if !e.is_user_error() {
        log::error!("inventory import failed at {} stage: {}", e.stage(), e);
    }

    (
        status,
        Json(ErrorResponse::new(&format!(
            "Import failed at {} stage: {}",
            e.stage(),
            e
        ))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_status_mapping() {
        let (status, _) = import_error_response(ImportError::FeedNotFound("x".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = import_error_response(ImportError::FeedMalformed("x".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = import_error_response(ImportError::ImportInProgress);
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = import_error_response(ImportError::SwapFailed("x".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
