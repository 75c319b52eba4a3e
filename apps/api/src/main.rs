mod config;
mod db;
mod errors;
mod extract;
mod layout;
mod models;
mod placements;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::create_pool;
use crate::placements::cache::RedisCacheInvalidator;
use crate::placements::lifecycle::PgBookletLifecycle;
use crate::placements::service::PlacementService;
use crate::placements::store::PgPlacementStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Booklet API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.db_max_connections).await?;

    // Initialize Redis (used only for cache eviction)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    let page_config = config.page_config();
    info!("Page capacity: {} units", page_config.capacity);

    let placements = PlacementService::new(
        Arc::new(PgPlacementStore::new(db.clone())),
        Arc::new(PgBookletLifecycle::new(db)),
        Arc::new(RedisCacheInvalidator::new(redis)),
        page_config,
    );

    // Build app state
    let state = AppState {
        placements: Arc::new(placements),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the booklet editor host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
