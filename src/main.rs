//! Money Flow - Main Application Entry Point
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Build the backend client and the change feed hub
//! 3. Start the idle session sweeper
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use money_flow::{app, config::Config, session, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(backend = %config.supabase_url, "Configuration loaded");

    let port = config.server_port;
    let max_idle = Duration::from_secs(config.session_idle_secs);
    let state = AppState::new(config)?;
    tracing::info!("Backend client ready");

    // Drop sessions nobody has used for a while
    session::spawn_idle_sweeper(state.sessions.clone(), max_idle);

    let app = app::router(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
