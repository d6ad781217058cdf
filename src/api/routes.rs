use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::api::{account_handlers, admin_handlers, handlers};
use crate::api::handlers::AppState;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Catalog
        .route("/products", get(handlers::list_products::<S>))
        .route("/products/:product_id", get(handlers::get_product::<S>))
        // Cart (session-scoped)
        .route("/cart", get(handlers::get_cart::<S>))
        .route("/cart", delete(handlers::clear_cart::<S>))
        .route("/cart/items", post(handlers::set_cart_item::<S>))
        .route(
            "/cart/items/:product_id",
            delete(handlers::remove_cart_item::<S>),
        )
        // Checkout
        .route("/checkout", post(account_handlers::checkout::<S>))
        // Customer accounts
        .route("/account/register", post(account_handlers::register::<S>))
        .route("/account/login", post(account_handlers::login::<S>))
        .route("/account/logout", post(account_handlers::logout::<S>))
        .route("/account/orders", get(account_handlers::my_orders::<S>))
        // Manager portal
        .route("/admin/login", post(admin_handlers::admin_login::<S>))
        .route("/admin/orders", get(admin_handlers::list_orders::<S>))
        .route(
            "/admin/orders/:order_id/approve",
            post(admin_handlers::approve_order::<S>),
        )
        .route(
            "/admin/orders/:order_id/reject",
            post(admin_handlers::reject_order::<S>),
        )
        .route(
            "/admin/orders/:order_id/archive",
            post(admin_handlers::toggle_archive_order::<S>),
        )
        .route(
            "/admin/products",
            get(admin_handlers::admin_list_products::<S>),
        )
        .route(
            "/admin/products/:product_id",
            patch(admin_handlers::update_product::<S>),
        )
        // Inventory resynchronization from the configured feed file
        .route(
            "/admin/inventory/reload",
            post(admin_handlers::reload_inventory::<S>),
        )
}
