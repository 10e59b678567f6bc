//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{HeuristicAnalyzer, ObjectContentStore, OpenAiAnalyzer, PgMetadataStore},
    config::{AnalyzerConfig, Config, MetadataBackend},
    error::ApiError,
    web::{self, ApiDoc, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::Router;
use docvault_core::ports::{AnalysisService, MetadataStore};
use docvault_core::InMemoryMetadataStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
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

    // --- 2. Metadata Store ---
    let metadata: Arc<dyn MetadataStore> = match &config.metadata {
        MetadataBackend::Postgres {
            database_url,
            max_connections,
        } => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(*max_connections)
                .connect(database_url)
                .await?;
            let store = PgMetadataStore::new(db_pool);
            info!("Running database migrations...");
            store.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(store)
        }
        MetadataBackend::Memory => {
            warn!("Using in-memory metadata; records are lost on restart");
            Arc::new(InMemoryMetadataStore::new())
        }
    };

    // --- 3. Content Store & Analysis Capability ---
    let content = Arc::new(ObjectContentStore::from_config(&config.storage)?);
    let analyzer = build_analyzer(&config.analyzer)?;

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(metadata, content, analyzer));

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(web::router(app_state, config.max_upload_bytes))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(web::cors_layer());

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_analyzer(config: &AnalyzerConfig) -> Result<Arc<dyn AnalysisService>, ApiError> {
    if config.use_mock {
        info!("Using the heuristic analyzer");
        return Ok(Arc::new(HeuristicAnalyzer::new()));
    }

    let api_key = config
        .openai_api_key
        .as_ref()
        .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
    let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
    info!("Using OpenAI model {} for analysis", config.model);
    Ok(Arc::new(OpenAiAnalyzer::new(
        openai_client,
        config.model.clone(),
        config.max_input_chars,
    )))
}
