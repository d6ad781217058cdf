use axum::serve;
use packline::api::handlers::AppState;
use packline::api::routes::create_router;
use packline::config::AppConfig;
use packline::seed;
use packline::store::{PostgresStore, ProductCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info) // Default to Info for everything
        .filter_module("sqlx", LevelFilter::Warn) // Suppress sqlx Debug logs
        .init();

    println!("Packline: B2B Storefront Server");

    // Load configuration
    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}",
        config.server.host, config.server.port
    );

    println!("Connecting to PostgreSQL...");
    let database_url = config.database_url()?;
    let postgres_store = PostgresStore::new(&database_url).await?;

    println!("Running database migrations...");
    postgres_store.migrate().await?;
    println!("Database ready");

    // Load seed data for demonstration (optional)
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        println!("Loading seed data...");
        seed::load_seed_data(&postgres_store).await?;
        println!("Seed data loaded successfully");
    }

    let pool = postgres_store.pool().clone();
    let cache = ProductCache::new(Duration::from_secs(config.inventory.cache_ttl_secs));
    let bind_address = config.server_address();

    let state = Arc::new(AppState {
        store: postgres_store,
        pool,
        cache,
        config,
    });

    run_server(create_router().with_state(state), &bind_address).await?;

    Ok(())
}

async fn run_server(app: axum::Router, bind_address: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    println!("Packline server running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
