use anyhow::Context;
use clap::Parser;
use statement_extract::config::cli::ServerArgs;
use statement_extract::utils::{logger, validation::Validate};
use statement_extract::{build_pipeline, server, AppConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    logger::init_server_logger(args.json_logs);

    let mut config = AppConfig::load(args.config.as_deref())
        .with_context(|| "Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config.validate().with_context(|| "Invalid configuration")?;

    let pipeline = match build_pipeline(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("❌ {}", e.user_friendly_message());
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            return Err(e.into());
        }
    };

    let app = server::router(Arc::new(pipeline), config.server.max_upload_bytes());

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    tracing::info!(
        bind = %config.server.bind,
        provider = %config.llm.provider,
        model = %config.llm.model(),
        staging = %config.staging.dir,
        "🚀 Bank statement extraction API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
