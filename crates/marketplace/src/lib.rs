//! Course marketplace library.
//!
//! Catalog, storefront, checkout and purchase fulfillment behind an axum HTTP
//! API. Reads go through a tag-invalidated cache; every write names the tags
//! it makes stale.

pub mod api;
pub mod config;
pub mod identity;
pub mod infra;
pub mod payments;
pub mod repository;
pub mod service;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use common::{CacheBackend, CacheConfig};

use crate::api::{create_router, AppState};
use crate::config::MarketplaceConfig;
use crate::infra::{DataCache, Database, RedisTagCache};

/// Run the HTTP server until it stops.
pub async fn run_server(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = MarketplaceConfig::from_env();
    config.service.host = host.to_string();
    config.service.port = port;

    let database = Arc::new(Database::connect(&config.database).await?);
    let cache = connect_cache(&config.cache).await?;
    info!(backend = cache.backend_name(), "Cache ready");

    let state = AppState::from_config(database, cache, &config);
    let app = create_router(state);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("{} listening on {}", config.service.service_name, addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the configured cache backend.
pub async fn connect_cache(config: &CacheConfig) -> Result<DataCache, Box<dyn std::error::Error>> {
    let cache = match config.backend {
        CacheBackend::Redis => DataCache::new(Arc::new(RedisTagCache::connect(config).await?)),
        CacheBackend::Memory => DataCache::in_memory(),
    };
    Ok(cache)
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = MarketplaceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{marker} {name}");
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Schema maintenance performed by `marketplace migrate`.
#[derive(Debug, Clone, Copy, clap::Subcommand)]
pub enum MigrateAction {
    /// Apply pending migrations
    Up,
    /// Revert the last migration
    Down,
    /// List migrations and whether each is applied
    Status,
    /// Drop everything and re-apply all migrations
    Fresh,
}
