//! Bedrock API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use bedrock_api::config::AppConfig;
use bedrock_api::error::AppError;
use bedrock_api::state::AppState;
use bedrock_core::clock::{Clock, SystemClock};
use bedrock_persistence::migrate::run_migrations;
use bedrock_persistence::pg_file_repository::PgFileRepository;
use bedrock_persistence::pg_user_repository::PgUserRepository;
use bedrock_storage::infrastructure::image_processor::RasterImageProcessor;
use bedrock_storage::infrastructure::local::LocalStorageProvider;
use bedrock_storage::infrastructure::validator::ImageFileValidator;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Bedrock API server");

    let config = AppConfig::from_env()?;

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    run_migrations(&pool)
        .await
        .map_err(|e| AppError::Startup(e.to_string()))?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let blobs = Arc::new(
        LocalStorageProvider::new(
            config.storage_root.clone(),
            &config.public_base_url,
            &config.signing_secret,
            Arc::clone(&clock),
        )
        .await
        .map_err(|e| AppError::Startup(format!("storage root unavailable: {e}")))?,
    );

    // Build application state.
    let app_state = AppState::new(
        clock,
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgFileRepository::new(pool)),
        blobs.clone(),
        Arc::new(ImageFileValidator::new()),
        Arc::new(RasterImageProcessor::new()),
        config.storage_settings(),
    )
    .with_local_blobs(blobs);

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = bedrock_api::build_router(app_state, config.max_upload_bytes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!(
        %addr,
        environment = %config.environment,
        storage_root = %config.storage_root.display(),
        "Listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
