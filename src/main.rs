use anyhow::{Context, Result};
use tenkei_registration::{config, gateway};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tenkei_registration=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!("Starting registration gateway");

    // Load configuration from environment
    let config = config::Config::from_env()?;

    if config.upstream_api_url.is_none() {
        warn!("BE_API_URL not set, registrations will be rejected");
    }
    if config.turnstile_secret_key.is_none() {
        warn!("TURNSTILE_SECRET_KEY not set, bot verification will always fail");
    }

    let port = config.port;
    let state = gateway::AppState::new(config)?;
    let app = gateway::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("✓ Listening on http://0.0.0.0:{}", port);
    info!("  POST /api/register        - Submit a registration");
    info!("  GET  /api/register/config - Public widget settings");
    info!("  GET  /health              - Health check");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
