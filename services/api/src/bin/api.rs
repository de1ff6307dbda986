//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{self, DbAdapter},
    config::Config,
    error::ApiError,
    web::{self, state::AppState},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Lesson Store & Run Migrations ---
    info!("Opening lesson store at {}...", config.database_url);
    let db_adapter = DbAdapter::connect(&config.database_url).await?;
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    if config.seed_sample_lessons {
        let seeded = db_adapter.seed_sample_lessons().await?;
        info!("Seeded {} sample lessons.", seeded);
    }

    // --- 3. Initialize Provider Adapters ---
    let analysis_provider = adapters::analysis_provider(&config)?;
    let video_provider = adapters::video_provider(&config)?;

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(db_adapter),
        analysis_provider,
        video_provider,
    ));

    // --- 5. Create the Web Router ---
    let app = web::router(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
