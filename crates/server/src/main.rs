//! netclass-server - network connection classifier
//!
//! Loads the feature schema and fitted artifacts, then serves the
//! prediction form and API until interrupted.

use anyhow::{Context, Result};
use classifier_lib::{
    health::HealthRegistry,
    observability::{ClassifierMetrics, StructuredLogger},
    pipeline::ClassificationPipeline,
};
use netclass_server::{
    api,
    config::{LogFormat, ServerConfig},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::load()?;

    // Initialize tracing with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init(),
    }

    info!(
        schema = %config.schema_path.display(),
        model_dir = %config.model_dir.display(),
        "Starting netclass-server"
    );

    let health_registry = HealthRegistry::new();

    // Artifacts are loaded before the listener binds; any failure is fatal
    let pipeline = ClassificationPipeline::load(&config.schema_path, &config.artifact_paths())
        .context("Failed to load classifier artifacts")?;

    let summaries = pipeline.store().summaries();
    health_registry
        .mark_loaded(
            pipeline.schema().len(),
            summaries.iter().map(|s| s.name.clone()).collect(),
        )
        .await;

    let metrics = ClassifierMetrics::new();
    metrics.set_schema_columns(pipeline.schema().len());
    metrics.set_model_info(&summaries);

    let logger = StructuredLogger::new(&config.service_name);
    logger.log_startup(SERVICE_VERSION, pipeline.schema().len(), &summaries);

    let app_state = Arc::new(api::AppState::new(
        Arc::new(pipeline),
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    let shutdown_logger = logger.clone();
    api::serve(&config.listen_address(), app_state, async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_logger.log_shutdown("SIGINT received");
        }
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
