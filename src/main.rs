use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod database;
mod encoding;
mod error;
mod http;
mod ledger;
mod objectstore;
mod service;

use config::AppConfig;
use database::Database;
use http::AppState;
use ledger::HttpDigestClient;
use objectstore::ObjectStore;
use service::VerificationService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evidence_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting evidence ledger verification service");

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded");

    // Initialize database
    let database = Database::new(&config.database_url).await?;
    info!("Database connected");

    // Run migrations
    database.run_migrations().await?;
    info!("Database migrations completed");

    // Digest endpoint client with the configured request timeout
    let digest_client = HttpDigestClient::new(
        config.digest_endpoint_url.clone(),
        Duration::from_secs(config.digest_timeout_secs),
    )?;

    let object_store = Arc::new(ObjectStore::new(
        config.object_store_host.clone(),
        config.object_store_signing_key.clone(),
    ));

    let service = Arc::new(VerificationService::new(database, digest_client));

    let state = AppState {
        service,
        object_store,
        signed_url_ttl_secs: config.signed_url_ttl_secs,
    };

    // Build application
    let app = http::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .into_inner(),
    );

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
