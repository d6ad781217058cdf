pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export logic types
pub use logic::{
    compute_rewrites, hash_password, load_feed, new_session, parse_feed, plan_rebuild, run_import,
    verify_password, CheckoutError, FeedEntry, ImportError, ImportReport, RebuildPlan,
};

// Export all model types
pub use model::*;

// Export seed module
pub use seed::*;

// Export store types
pub use store::{PostgresStore, ProductCache, Store};

// Function for integration testing
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    use crate::api::handlers::AppState;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with INFO level only (suppress DEBUG logs)
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    // Load configuration
    let config = crate::config::AppConfig::load()?;

    // Connect to PostgreSQL
    let database_url = config.database_url()?;
    let postgres_store = crate::store::PostgresStore::new(&database_url).await?;

    // Run migrations
    postgres_store.migrate().await?;

    let pool = postgres_store.pool().clone();
    let cache = ProductCache::new(Duration::from_secs(config.inventory.cache_ttl_secs));
    let bind_address = config.server_address();

    let state = Arc::new(AppState {
        store: postgres_store,
        pool,
        cache,
        config,
    });

    // Create router with state
    let app = crate::api::routes::create_router().with_state(state);

    let listener = TcpListener::bind(&bind_address).await?;

    serve(listener, app).await?;

    Ok(())
}
