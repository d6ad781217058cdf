use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse, Json, Response},
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::handlers::{
    ensure_session, internal_error, load_session, require_customer, with_optional_cookie,
    AppState, ErrorResponse, HandlerError, ListResponse,
};
use crate::api::session::{clear_session_cookie, SessionToken};
use crate::logic;
use crate::model::{Customer, Id, NewCustomer, Order, OrderView};
use crate::store::traits::Store;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub customer_id: Id,
    pub email: String,
    pub name: String,
}

impl From<&Customer> for AccountResponse {
    fn from(customer: &Customer) -> Self {
        Self {
            customer_id: customer.id,
            email: customer.email.clone(),
            name: customer.name.clone(),
        }
    }
}

/// Bind the request's session (minted if absent) to the customer and
/// answer with the account payload, setting the cookie when fresh
async fn respond_logged_in<S: Store>(
    state: &AppState<S>,
    token: &SessionToken,
    customer: &Customer,
) -> Result<Response, HandlerError> {
    let (session, created) = ensure_session(&state.store, token).await?;

    state
        .store
        .update_session(&session.token, Some(customer.id), session.is_admin)
        .await
        .map_err(internal_error)?;

    Ok(with_optional_cookie(
        AccountResponse::from(customer),
        created.then_some(session.token.as_str()),
    ))
}

pub async fn register<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
    RequestJson(request): RequestJson<NewCustomer>,
) -> Result<Response, HandlerError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') || request.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Email and password are required")),
        ));
    }

    match state.store.find_customer_by_email(&email).await {
        Ok(Some(_)) => {
            return Err((
                StatusCode::CONFLICT,
                Json(ErrorResponse::new("An account with that email already exists")),
            ))
        }
        Ok(None) => {}
        Err(e) => return Err(internal_error(e)),
    }

    let digest = logic::hash_password(&request.password);
    let customer = state
        .store
        .create_customer(&email, request.name.trim(), &digest)
        .await
        .map_err(internal_error)?;

    log::info!("customer {} registered", customer.id);
    respond_logged_in(&state, &token, &customer).await
}

pub async fn login<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
    RequestJson(request): RequestJson<LoginRequest>,
) -> Result<Response, HandlerError> {
    let email = request.email.trim().to_lowercase();

    let customer = match state.store.find_customer_by_email(&email).await {
        Ok(Some(customer)) => customer,
        Ok(None) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Invalid email or password")),
            ))
        }
        Err(e) => return Err(internal_error(e)),
    };

    if !logic::verify_password(&request.password, &customer.password_digest) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid email or password")),
        ));
    }

    respond_logged_in(&state, &token, &customer).await
}

pub async fn logout<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
) -> Result<Response, HandlerError> {
    if let Some(session) = load_session(&state.store, &token).await? {
        state
            .store
            .delete_session(&session.token)
            .await
            .map_err(internal_error)?;
    }

    Ok((
        AppendHeaders([(SET_COOKIE, clear_session_cookie())]),
        Json(serde_json::json!({"logged_out": true})),
    )
        .into_response())
}

/// Order history for the logged-in customer, with line items resolved
/// against the live catalog (retired products render as placeholders)
pub async fn my_orders<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
) -> Result<Json<ListResponse<OrderView>>, HandlerError> {
    let (_, customer_id) = require_customer(&state.store, &token).await?;

    let orders: Vec<Order> = state
        .store
        .list_orders_for_customer(customer_id)
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

/// Checkout: turn the session cart into a pending order
pub async fn checkout<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    token: SessionToken,
) -> Result<Json<OrderView>, HandlerError> {
    let (session, customer_id) = require_customer(&state.store, &token).await?;

    match logic::checkout(&state.store, &session.token, customer_id).await {
        Ok(order) => {
            let view = logic::order_view(&state.store, order)
                .await
                .map_err(internal_error)?;
            Ok(Json(view))
        }
        Err(logic::CheckoutError::EmptyCart) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Cart is empty")),
        )),
        Err(logic::CheckoutError::Store(e)) => Err(internal_error(e)),
    }
}
