mod catalog;
mod config;
mod errors;
mod llm_client;
mod pipeline;
mod routes;
mod session;
mod state;
mod transcript;
mod verification;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pipeline::VerificationPipeline;
use crate::routes::build_router;
use crate::session::store::{MemorySessionStore, PgSessionStore, SessionStore};
use crate::session::SessionRegistry;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; missing required env vars abort startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TransferMap API v{}", env!("CARGO_PKG_VERSION"));

    // Session persistence: PostgreSQL when configured, in-process otherwise
    let store: Arc<dyn SessionStore> = match &config.database_url {
        Some(url) => Arc::new(PgSessionStore::connect(url).await?),
        None => {
            warn!("DATABASE_URL not set; session records are kept in memory only");
            Arc::new(MemorySessionStore::new())
        }
    };

    // Initialize analysis service client
    let llm = LlmClient::new(config.service.clone())?;
    info!(
        "Analysis service: {} (model: {}, timeout: {}s)",
        config.service.provider,
        config.service.model,
        config.service.timeout.as_secs()
    );

    // Build app state
    let state = AppState {
        pipeline: VerificationPipeline::new(Arc::new(llm)),
        sessions: Arc::new(SessionRegistry::new(store)),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS origins to the deployed frontend

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
