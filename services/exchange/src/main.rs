use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use catalog::{CatalogClient, CatalogConfig};
use common::database::{DatabaseConfig, health_check, init_pool};
use exchange::{
    AppState, Exchange,
    config::{ExchangeConfig, JwtConfig, StoreKind},
    middleware::JwtVerifier,
    routes,
    store::{MemoryStore, PgStore, Store},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting exchange service");

    let config = ExchangeConfig::from_env().map_err(anyhow::Error::msg)?;
    let jwt_config = JwtConfig::from_env().map_err(anyhow::Error::msg)?;
    let verifier = JwtVerifier::new(&jwt_config).map_err(anyhow::Error::msg)?;
    let catalog = CatalogClient::new(CatalogConfig::from_env()?)?;

    let store: Arc<dyn Store> = match config.store {
        StoreKind::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            if health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            let store = PgStore::new(pool);
            store.migrate().await?;
            Arc::new(store)
        }
        StoreKind::Memory => {
            info!("Using in-memory store; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let exchange = Exchange::new(store, catalog);
    exchange.repair_ownership().await?;

    info!("Exchange service initialized successfully");

    let app = routes::create_router(AppState::new(exchange, verifier));

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Exchange service listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
