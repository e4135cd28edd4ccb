mod api;
mod routes;
mod telegram;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::routes::AppState;
use relaywatch_core::{AlertDispatcher, Brain, Orchestrator, Settings, ToolRegistry};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging Setup
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    info!("RelayWatch Gateway Initializing...");
    let settings = Settings::from_env()?;

    // 2. The Brain
    info!("Connecting to OpenAI Brain...");
    let brain = Brain::new(&settings.llm);
    match brain.ping().await {
        Ok(msg) => info!("Brain Status: {}", msg),
        Err(e) => error!("Brain is online but unresponsive: {}", e),
    }

    // 3. The Registry (the menu the Brain may order from)
    let dispatcher = Arc::new(
        AlertDispatcher::new(&settings.alert).context("Failed to build alert HTTP client")?,
    );
    let mut registry = ToolRegistry::new();
    dispatcher
        .register(&mut registry)
        .context("Failed to register alert tool")?;
    info!(
        "Loaded {} tool(s); alerts go to {}",
        registry.len(),
        settings.alert.endpoint
    );

    // 4. Bundle State
    let state = AppState {
        orchestrator: Orchestrator::new(Arc::new(brain), Arc::new(registry)),
        webhook_secret: std::env::var("TELEGRAM_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(Arc::from),
    };
    if state.webhook_secret.is_none() {
        info!("TELEGRAM_WEBHOOK_SECRET not set; webhook calls are not authenticated");
    }

    // 5. Start Server
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("Gateway listening on {}...", bind_addr);

    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
