mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use crate::config::{CatalogSource, LoggingSettings, Settings};
use crate::routes::recommend::AppState;
use crate::services::{CacheManager, CachedEmbedder, CatalogProvider, HttpEmbedder, PostgresClient, SnapshotStore, StaticCatalog};
use crate::core::{Embedder, Matcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// LOG_LEVEL / LOG_FORMAT win over the config file; RUST_LOG wins over both
fn init_logging(logging: &LoggingSettings) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&settings.logging);

    info!("Starting program-match recommendation service...");
    info!("Configuration loaded successfully");

    // Embedding client, with the cache in front when Redis is reachable
    let http_embedder = HttpEmbedder::new(
        settings.embedding.endpoint.clone(),
        settings.embedding.api_key.clone(),
        settings.embedding.dimension,
        settings.embedding.timeout_secs,
    )
    .map_err(|e| startup_error("Failed to build embedding client", e))?;

    let cache_ttl = settings.cache.ttl_secs.unwrap_or(86_400);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(10_000);

    let embedder: Arc<dyn Embedder> = match &settings.cache.redis_url {
        Some(redis_url) => match CacheManager::new(redis_url, l1_cache_size, cache_ttl).await {
            Ok(cache) => {
                info!("Embedding cache initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
                Arc::new(CachedEmbedder::new(http_embedder, Arc::new(cache)))
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), embeddings will not be cached", e);
                Arc::new(http_embedder)
            }
        },
        None => {
            info!("No Redis URL configured, embeddings will not be cached");
            Arc::new(http_embedder)
        }
    };

    info!(
        "Embedding client initialized ({} dimensions, endpoint {})",
        settings.embedding.dimension, settings.embedding.endpoint
    );

    // Catalog source
    let (provider, postgres): (Arc<dyn CatalogProvider>, Option<Arc<PostgresClient>>) = match settings.catalog.source {
        CatalogSource::Postgres => {
            let postgres = Arc::new(
                PostgresClient::from_settings(
                    &settings.database.url,
                    settings.database.max_connections,
                    settings.database.min_connections,
                    settings.database.acquire_timeout_secs,
                    settings.database.idle_timeout_secs,
                )
                .await
                .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?,
            );
            info!("PostgreSQL client initialized");
            let provider: Arc<dyn CatalogProvider> = postgres.clone();
            (provider, Some(postgres))
        }
        CatalogSource::File => {
            let path = settings.catalog.path.as_ref().ok_or_else(|| {
                startup_error("Invalid catalog configuration", "catalog.path is required when source = \"file\"")
            })?;
            let catalog = StaticCatalog::from_json_file(path)
                .map_err(|e| startup_error("Failed to load catalog file", e))?;
            info!("Static catalog loaded from {}", path.display());
            let provider: Arc<dyn CatalogProvider> = Arc::new(catalog);
            (provider, None)
        }
    };

    let catalog = Arc::new(SnapshotStore::new(
        provider,
        Duration::from_secs(settings.catalog.refresh_secs),
    ));

    // Warm the snapshot; a failure here is retried on the first request
    if let Err(e) = catalog.current().await {
        warn!("Initial catalog load failed: {}", e);
    }

    let matcher = Matcher::new(settings.scoring_weights(), settings.match_policy());

    info!(
        "Matcher initialized with weights {:?} and policy {:?}",
        matcher.weights(),
        matcher.policy()
    );

    // Build application state
    let app_state = AppState {
        embedder,
        catalog,
        postgres,
        matcher,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
