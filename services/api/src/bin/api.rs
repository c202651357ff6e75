//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, summary_llm::OpenAiSummaryAdapter},
    config::Config,
    error::ApiError,
    web::{rest::ApiDoc, router, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use study_insights_core::{InsightsService, NarrativeCache, NarrativeOrchestrator};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(&config.openai_api_key);
    let openai_client = Client::with_config(openai_config);
    let summary_adapter = Arc::new(OpenAiSummaryAdapter::new(
        openai_client,
        config.summary_model.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let mut narrator = NarrativeOrchestrator::new(summary_adapter, config.narrative_timeout);
    if config.narrative_cache_capacity > 0 {
        narrator = narrator.with_cache(Arc::new(NarrativeCache::new(
            config.narrative_cache_capacity,
            config.narrative_cache_ttl,
        )));
    }
    let app_state = Arc::new(AppState {
        config: config.clone(),
        insights: InsightsService::new(db_adapter.clone(), config.mastery),
        narrator,
        auth_sessions: db_adapter,
    });
    info!(
        "Mastery policy: min {} attempts, strength >= {}%, weakness <= {}%, top {}",
        config.mastery.min_attempts,
        config.mastery.strength_threshold,
        config.mastery.weakness_threshold,
        config.mastery.top_k
    );

    // --- 5. Create the Web Router ---
    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    let app = Router::new()
        .merge(router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
