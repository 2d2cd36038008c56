pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod db;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod workers;

use std::sync::Arc;

use repitis_algo::{MemoryError, MemoryModel};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::cache::RedisCache;
use crate::catalog::{Catalog, CatalogError};
use crate::config::Config;
use crate::db::{Database, DbInitError};
use crate::services::progress::ProgressAggregator;
use crate::services::scheduler::Scheduler;
use crate::services::session::{SessionController, SessionRegistry};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("database: {0}")]
    Database(#[from] DbInitError),
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("memory model: {0}")]
    MemoryModel(#[from] MemoryError),
}

/// Wires storage, catalog, model and services from `config`.
pub async fn build_state(config: Config) -> Result<AppState, InitError> {
    let config = Arc::new(config);
    if !config.verifies_tokens() {
        tracing::warn!(
            "JWT_SECRET is not set: bearer tokens are trusted without signature checks, \
             only run this behind an authenticating gateway"
        );
    }

    let db = Database::connect(&config.database_url, config.database_max_connections).await?;

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin()?,
    };
    let source = config
        .catalog_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "builtin".to_string());
    tracing::info!(
        levels = catalog.levels().len(),
        cards = catalog.cards().len(),
        source = %source,
        "catalog loaded"
    );
    let catalog = Arc::new(catalog);

    let model = Arc::new(MemoryModel::new(config.memory_params.clone())?);

    let cache = match &config.redis_url {
        Some(url) => match RedisCache::connect(url).await {
            Ok(cache) => {
                tracing::info!("redis cache connected");
                Some(cache)
            }
            Err(err) => {
                tracing::warn!(error = %err, "redis unavailable, stats cache disabled");
                None
            }
        },
        None => None,
    };

    let mut scheduler = Scheduler::new(db.clone(), model, config.storage_retry);
    let mut progress = ProgressAggregator::new(
        db.clone(),
        Arc::clone(&catalog),
        config.mastery,
        config.day_offset,
        config.storage_retry,
    );
    if let Some(cache) = &cache {
        scheduler = scheduler.with_cache(cache.clone(), config.day_offset);
        progress = progress.with_cache(cache.clone(), config.stats_cache_ttl);
    }

    let sessions = Arc::new(SessionController::new(
        Arc::clone(&catalog),
        scheduler,
        progress.clone(),
        Arc::new(SessionRegistry::new()),
        config.session,
    ));

    Ok(AppState::new(
        config,
        db,
        catalog,
        cache,
        sessions,
        Arc::new(progress),
    ))
}

pub fn create_router(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn create_app(config: Config) -> Result<axum::Router, InitError> {
    let state = build_state(config).await?;
    Ok(create_router(state))
}
