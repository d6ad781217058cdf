use anyhow::{Context, Result};
use sqlx::Row;

use crate::logic;
use crate::store::traits::{CustomerStore, OrderStore, SessionStore};
use crate::store::PostgresStore;

/// Load a small demonstration catalog plus one customer with a pending
/// order. Skipped when the catalog already has rows, so restarting the
/// server with LOAD_SEED_DATA=true stays harmless.
pub async fn load_seed_data(store: &PostgresStore) -> Result<()> {
    let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM products")
        .fetch_one(store.pool())
        .await
        .context("Failed to count products")?
        .get("count");

    if count > 0 {
        log::info!("seed skipped: catalog already has {} products", count);
        return Ok(());
    }

    let catalog: [(i64, &str, &str, f64); 6] = [
        (1, "BOX-A", "Single-wall shipping carton, 12x9x6", 1.00),
        (2, "BOX-B", "Double-wall shipping carton, 18x12x10", 2.25),
        (3, "LABEL-R", "4x6 thermal label roll, 500 count", 8.50),
        (4, "MAILER-P", "Poly mailer, 10x13, pack of 100", 6.75),
        (5, "TAPE-B", "48mm packing tape, clear", 2.00),
        (6, "WRAP-S", "Stretch wrap roll, 18in", 11.40),
    ];

    for (id, name, description, price) in catalog {
        sqlx::query("INSERT INTO products (id, name, description, price) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(name)
            .bind(description)
            .bind(price)
            .execute(store.pool())
            .await
            .context("Failed to seed product")?;
    }

    let customer = store
        .create_customer(
            "buyer@example.com",
            "Demo Buyer",
            &logic::hash_password("password"),
        )
        .await?;

    // A cart session for the demo order; checkout clears it
    let session = logic::new_session(Some(customer.id), false);
    store.create_session(session.clone()).await?;

    store
        .create_order(
            customer.id,
            &session.token,
            2.0 * 1.00 + 1.0 * 2.00,
            &[(1, 2), (5, 1)],
        )
        .await?;

    log::info!("seed data loaded: {} products, 1 customer, 1 order", catalog.len());
    Ok(())
}
