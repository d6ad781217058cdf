use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use packline::config::AppConfig;
use packline::logic::run_import;
use packline::store::ProductCache;

/// One-shot administrative reload of the product catalog from a JSON
/// feed file. Usage:
///
///     reload-inventory [FEED_PATH]
///
/// FEED_PATH defaults to the configured inventory.feed_path. The whole
/// pipeline runs in a single transaction; on any failure the catalog
/// and order line items are left exactly as they were.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = AppConfig::load()?;
    let feed_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.inventory.feed_path.clone());

    // Connect to database
    let database_url = config.database_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    println!("Connected to database. Reloading inventory from {}...", feed_path);

    // No server process shares this cache; it exists so the importer's
    // invalidation path is exercised the same way as in-process
    let cache = ProductCache::new(Duration::from_secs(1));

    let report = run_import(&pool, &cache, &feed_path).await?;

    println!(
        "Inventory reload complete: {} products, {} line items remapped",
        report.products, report.remapped_line_items
    );
    if !report.retired_product_ids.is_empty() {
        println!(
            "Retired product ids (line items keep pointing at them): {:?}",
            report.retired_product_ids
        );
    }
    for warning in &report.warnings {
        println!("warning: {}", warning);
    }

    Ok(())
}
