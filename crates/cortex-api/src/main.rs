//! Cortex API server entry point.

use std::sync::{Arc, Mutex};

use cortex_api::config::AppConfig;
use cortex_api::error::AppError;
use cortex_api::state::AppState;
use cortex_api::{build_router, telemetry};
use cortex_core::clock::SystemClock;
use cortex_core::content::ContentStore;
use cortex_core::generation::GenerationBackend;
use cortex_core::repository::GameStore;
use cortex_core::rng::SystemRng;
use cortex_dice::application::cascade::SharedRng;
use cortex_generation::{ModelFallback, OpenAiCompatBackend};
use cortex_narrative::application::pipeline::TurnPipeline;
use cortex_store::{ContentPack, PgContentStore, PgGameStore};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let tracer_provider = telemetry::init_tracing(config.otlp_endpoint.as_deref())?;

    info!("Starting Cortex API server");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let store: Arc<dyn GameStore> = Arc::new(PgGameStore::new(pool.clone()));
    let content: Arc<dyn ContentStore> = match &config.content_pack {
        Some(path) => Arc::new(ContentPack::load(path)?),
        None => Arc::new(PgContentStore::new(pool)),
    };
    let backend: Arc<dyn GenerationBackend> = Arc::new(OpenAiCompatBackend::new(
        config.generation_base_url.as_str(),
        config.generation_api_key.as_str(),
        config.generation_timeout,
    )?);
    let summarizer = ModelFallback::new(
        Arc::clone(&backend),
        config.fallback_models.clone(),
        config.generation_timeout,
    );
    let settings = config.agent_settings(&summarizer);

    let pipeline = Arc::new(TurnPipeline::new(
        store,
        content,
        backend,
        Arc::new(summarizer),
        Arc::new(SystemClock),
        settings,
    ));
    let rng: SharedRng = Arc::new(Mutex::new(SystemRng::new()));
    let app = build_router(AppState::new(
        Arc::clone(&pipeline),
        rng,
        config.dice_timing,
    ));

    let addr = config.socket_addr()?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pipeline.drain_background().await;
    if let Some(Err(e)) = tracer_provider.map(|p| p.shutdown()) {
        warn!(error = %e, "trace exporter shutdown failed");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
}
