mod config;
mod errors;
mod evaluation;
mod llm_client;
mod routes;
mod state;
mod usage;
mod web;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::usage::gate::{CooldownGate, GatePolicy};
use crate::usage::store::{JsonFileStore, UsageLedger};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Recruiter v{}", env!("CARGO_PKG_VERSION"));

    // Usage store: read once, then owned by the ledger
    let ledger = UsageLedger::open(JsonFileStore::new(&config.usage_file));

    // Cooldown gate
    if config.admin_access_code.is_none() {
        warn!("ADMIN_ACCESS_CODE is not set; admin override is disabled");
    }
    let gate = CooldownGate::new(GatePolicy {
        cooldown: config.cooldown,
        admin_secret: config.admin_access_code.clone(),
    });
    info!("Cooldown gate initialized ({}s per user)", config.cooldown.as_secs());

    // Initialize LLM client
    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        config.gemini_api_base.clone(),
        config.llm_max_attempts,
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Build app state
    let state = AppState {
        config: config.clone(),
        gate: Arc::new(gate),
        ledger: Arc::new(ledger),
        generator: Arc::new(llm),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the form is served behind a fixed domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    // Peer addresses feed the caller identity
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
