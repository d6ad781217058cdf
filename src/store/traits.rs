use crate::model::{
    CartItem, Customer, Id, LineItem, Order, OrderStatus, Product, ProductUpdate, Session,
};
use anyhow::Result;

#[async_trait::async_trait]
pub trait ProductStore: Send + Sync {
    async fn get_product(&self, id: Id) -> Result<Option<Product>>;
    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>>;
    async fn list_products(&self) -> Result<Vec<Product>>;
    async fn update_product(&self, id: Id, update: ProductUpdate) -> Result<Option<Product>>;
}

#[async_trait::async_trait]
pub trait CustomerStore: Send + Sync {
    async fn get_customer(&self, id: Id) -> Result<Option<Customer>>;
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>>;
    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        password_digest: &str,
    ) -> Result<Customer>;
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, token: &str) -> Result<Option<Session>>;
    async fn create_session(&self, session: Session) -> Result<()>;
    /// Bind or unbind the customer and admin flag on an existing session
    async fn update_session(
        &self,
        token: &str,
        customer_id: Option<Id>,
        is_admin: bool,
    ) -> Result<bool>;
    async fn delete_session(&self, token: &str) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait CartStore: Send + Sync {
    async fn list_cart_items(&self, session_token: &str) -> Result<Vec<CartItem>>;
    /// Upsert a cart line; a quantity of zero or less removes the line
    async fn set_cart_item(&self, session_token: &str, product_id: Id, quantity: i32)
        -> Result<()>;
    async fn remove_cart_item(&self, session_token: &str, product_id: Id) -> Result<bool>;
    async fn clear_cart(&self, session_token: &str) -> Result<()>;
}

#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, id: Id) -> Result<Option<Order>>;
    async fn list_orders_for_customer(&self, customer_id: Id) -> Result<Vec<Order>>;
    async fn list_orders(&self, include_archived: bool) -> Result<Vec<Order>>;
    async fn list_line_items(&self, order_id: Id) -> Result<Vec<LineItem>>;
    /// Create the order header and its line items, and clear the
    /// originating cart, in one transaction
    async fn create_order(
        &self,
        customer_id: Id,
        session_token: &str,
        total: f64,
        items: &[(Id, i32)],
    ) -> Result<Order>;
    async fn set_order_status(&self, id: Id, status: OrderStatus) -> Result<bool>;
    async fn toggle_order_archived(&self, id: Id) -> Result<Option<bool>>;
}

pub trait Store:
    ProductStore + CustomerStore + SessionStore + CartStore + OrderStore + Send + Sync
{
}
