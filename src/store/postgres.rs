use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::model::{
    CartItem, Customer, Id, LineItem, Order, OrderStatus, Product, ProductUpdate, Session,
};
use crate::store::traits::{
    CartStore, CustomerStore, OrderStore, ProductStore, SessionStore, Store,
};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the schema if it does not exist yet. All statements are
    /// idempotent so this is safe to run on every startup.
    ///
    /// `order_items.product_id` intentionally carries no REFERENCES
    /// clause into `products`: the catalog table is dropped and rebuilt
    /// wholesale by the inventory importer, and retired identifiers are
    /// kept on historical line items by design.
    pub async fn migrate(&self) -> Result<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                price DOUBLE PRECISION NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS customers (
                id BIGSERIAL PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                password_digest TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                customer_id BIGINT REFERENCES customers(id),
                is_admin BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS cart_items (
                id BIGSERIAL PRIMARY KEY,
                session_token TEXT NOT NULL,
                product_id BIGINT NOT NULL,
                quantity INT NOT NULL CHECK (quantity > 0),
                UNIQUE (session_token, product_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id BIGSERIAL PRIMARY KEY,
                customer_id BIGINT NOT NULL REFERENCES customers(id),
                status TEXT NOT NULL DEFAULT 'pending',
                total DOUBLE PRECISION NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                archived BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS order_items (
                id BIGSERIAL PRIMARY KEY,
                order_id BIGINT NOT NULL REFERENCES orders(id),
                product_id BIGINT NOT NULL,
                quantity INT NOT NULL
            )
            "#,
        ];

        for statement in ddl {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to run schema migration")?;
        }

        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_product(row: &sqlx::postgres::PgRow) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price: row.get("price"),
    }
}

fn row_to_order(row: &sqlx::postgres::PgRow) -> Order {
    let status: String = row.get("status");
    Order {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        status: OrderStatus::from_str(&status),
        total: row.get("total"),
        created_at: row.get("created_at"),
        archived: row.get("archived"),
    }
}

#[async_trait::async_trait]
impl ProductStore for PostgresStore {
    async fn get_product(&self, id: Id) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT id, name, description, price FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch product")?;

        Ok(row.as_ref().map(row_to_product))
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT id, name, description, price FROM products WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch product by name")?;

        Ok(row.as_ref().map(row_to_product))
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query("SELECT id, name, description, price FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list products")?;

        Ok(rows.iter().map(row_to_product).collect())
    }

    async fn update_product(&self, id: Id, update: ProductUpdate) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price)
            WHERE id = $1
            RETURNING id, name, description, price
            "#,
        )
        .bind(id)
        .bind(update.name)
        .bind(update.description)
        .bind(update.price)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update product")?;

        Ok(row.as_ref().map(row_to_product))
    }
}

#[async_trait::async_trait]
impl CustomerStore for PostgresStore {
    async fn get_customer(&self, id: Id) -> Result<Option<Customer>> {
        let row = sqlx::query(
            "SELECT id, email, name, password_digest, created_at FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Customer {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            password_digest: row.get("password_digest"),
            created_at: row.get("created_at"),
        }))
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(
            "SELECT id, email, name, password_digest, created_at FROM customers WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer by email")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Customer {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            password_digest: row.get("password_digest"),
            created_at: row.get("created_at"),
        }))
    }

    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        password_digest: &str,
    ) -> Result<Customer> {
        let row = sqlx::query(
            r#"
            INSERT INTO customers (email, name, password_digest)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password_digest, created_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_digest)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create customer")?;

        Ok(Customer {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            password_digest: row.get("password_digest"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait::async_trait]
impl SessionStore for PostgresStore {
    async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT token, customer_id, is_admin, created_at, expires_at
            FROM sessions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch session")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Session {
            token: row.get("token"),
            customer_id: row.get("customer_id"),
            is_admin: row.get("is_admin"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
        }))
    }

    async fn create_session(&self, session: Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, customer_id, is_admin, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&session.token)
        .bind(session.customer_id)
        .bind(session.is_admin)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .context("Failed to create session")?;

        Ok(())
    }

    async fn update_session(
        &self,
        token: &str,
        customer_id: Option<Id>,
        is_admin: bool,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET customer_id = $2, is_admin = $3 WHERE token = $1",
        )
        .bind(token)
        .bind(customer_id)
        .bind(is_admin)
        .execute(&self.pool)
        .await
        .context("Failed to update session")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_session(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .context("Failed to delete session")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl CartStore for PostgresStore {
    async fn list_cart_items(&self, session_token: &str) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_token, product_id, quantity
            FROM cart_items
            WHERE session_token = $1
            ORDER BY id
            "#,
        )
        .bind(session_token)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list cart items")?;

        Ok(rows
            .into_iter()
            .map(|row| CartItem {
                id: row.get("id"),
                session_token: row.get("session_token"),
                product_id: row.get("product_id"),
                quantity: row.get("quantity"),
            })
            .collect())
    }

    async fn set_cart_item(
        &self,
        session_token: &str,
        product_id: Id,
        quantity: i32,
    ) -> Result<()> {
        if quantity <= 0 {
            self.remove_cart_item(session_token, product_id).await?;
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO cart_items (session_token, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (session_token, product_id) DO UPDATE SET
                quantity = EXCLUDED.quantity
            "#,
        )
        .bind(session_token)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await
        .context("Failed to upsert cart item")?;

        Ok(())
    }

    async fn remove_cart_item(&self, session_token: &str, product_id: Id) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM cart_items WHERE session_token = $1 AND product_id = $2")
                .bind(session_token)
                .bind(product_id)
                .execute(&self.pool)
                .await
                .context("Failed to remove cart item")?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, session_token: &str) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE session_token = $1")
            .bind(session_token)
            .execute(&self.pool)
            .await
            .context("Failed to clear cart")?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderStore for PostgresStore {
    async fn get_order(&self, id: Id) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, customer_id, status, total, created_at, archived FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch order")?;

        Ok(row.as_ref().map(row_to_order))
    }

    async fn list_orders_for_customer(&self, customer_id: Id) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, status, total, created_at, archived
            FROM orders
            WHERE customer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list orders for customer")?;

        Ok(rows.iter().map(row_to_order).collect())
    }

    async fn list_orders(&self, include_archived: bool) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, status, total, created_at, archived
            FROM orders
            WHERE archived = FALSE OR $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(include_archived)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list orders")?;

        Ok(rows.iter().map(row_to_order).collect())
    }

    async fn list_line_items(&self, order_id: Id) -> Result<Vec<LineItem>> {
        let rows = sqlx::query(
            "SELECT id, order_id, product_id, quantity FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list line items")?;

        Ok(rows
            .into_iter()
            .map(|row| LineItem {
                id: row.get("id"),
                order_id: row.get("order_id"),
                product_id: row.get("product_id"),
                quantity: row.get("quantity"),
            })
            .collect())
    }

    async fn create_order(
        &self,
        customer_id: Id,
        session_token: &str,
        total: f64,
        items: &[(Id, i32)],
    ) -> Result<Order> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin checkout transaction")?;

        let created_at = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO orders (customer_id, status, total, created_at, archived)
            VALUES ($1, 'pending', $2, $3, FALSE)
            RETURNING id
            "#,
        )
        .bind(customer_id)
        .bind(total)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to create order")?;

        let order_id: Id = row.get("id");

        for (product_id, quantity) in items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity) VALUES ($1, $2, $3)",
            )
            .bind(order_id)
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await
            .context("Failed to create line item")?;
        }

        sqlx::query("DELETE FROM cart_items WHERE session_token = $1")
            .bind(session_token)
            .execute(&mut *tx)
            .await
            .context("Failed to clear cart at checkout")?;

        tx.commit()
            .await
            .context("Failed to commit checkout transaction")?;

        Ok(Order {
            id: order_id,
            customer_id,
            status: OrderStatus::Pending,
            total,
            created_at,
            archived: false,
        })
    }

    async fn set_order_status(&self, id: Id, status: OrderStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to update order status")?;

        Ok(result.rows_affected() > 0)
    }

    async fn toggle_order_archived(&self, id: Id) -> Result<Option<bool>> {
        let row = sqlx::query("UPDATE orders SET archived = NOT archived WHERE id = $1 RETURNING archived")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to toggle order archive flag")?;

        Ok(row.map(|row| row.get("archived")))
    }
}

impl Store for PostgresStore {}
