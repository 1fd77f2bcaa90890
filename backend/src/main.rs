use std::{sync::Arc, time::Duration};

use anyhow::Context;

use axum::Router;
use axum::http::{HeaderValue, Method};
use party_match::{
    db::{self, PgDocumentStore},
    get_db_pool, handlers,
    services::YelpProvider,
    utils, Config, PartyService,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let db_config = db::DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    // Run migrations
    db::migrations::run_migrations(&pool).await?;

    let api_key = config
        .search_api_key
        .clone()
        .context("SEARCH_API_KEY must be set")?;
    let provider = YelpProvider::new(
        config.search_api_url.clone(),
        api_key,
        Duration::from_secs(config.search_timeout_secs),
    );
    let service = PartyService::new(
        Arc::new(PgDocumentStore::new(pool)),
        Arc::new(provider),
        config.tx_max_attempts,
    );

    let port = config.port;
    let app = create_router(service, &config);

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Server running on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(service: PartyService, config: &Config) -> Router {
    handlers::router(service)
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(config))
}

fn create_cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        // Default to permissive for development
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}
