//! Todolist HTTP server.
//!
//! This binary:
//! - Validates the environment (`.env` is loaded first when present)
//! - Connects the record store to the hosted database's REST API
//! - Connects the rate limiter to Redis
//! - Signs callers in through the hosted auth API without keeping sessions
//! - Serves the router until Ctrl+C
//!
//! # Usage
//!
//! ```bash
//! APP_ENV=development cargo run --bin todolist-server
//! ```

use anyhow::Context;
use std::net::SocketAddr;
use todolist_auth::providers::GoTrueClient;
use todolist_auth::stores::RedisRateLimiter;
use todolist_core::{RecordStore, TodoService};
use todolist_postgrest::PostgrestBackend;
use todolist_server::Config;
use todolist_web::{AppState, router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,todolist=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        environment = %config.environment,
        supabase = %config.supabase.url,
        requests = config.rate_limit.requests,
        window_secs = config.rate_limit.window.as_secs(),
        trust_proxy_headers = config.trust_proxy_headers,
        "Configuration loaded"
    );

    let todos = TodoService::new(RecordStore::new(PostgrestBackend::new(
        &config.supabase.url,
        config.supabase.anon_key.clone(),
    )));

    let limiter = RedisRateLimiter::new(
        &config.rate_limit.redis_url,
        Some(config.rate_limit.redis_token.as_str()),
        config.rate_limit.requests,
        config.rate_limit.window,
    )
    .await
    .context("Failed to connect the rate limiter")?;

    let auth = GoTrueClient::new(config.supabase.url.clone(), config.supabase.anon_key.clone())
        .without_session();

    let app = router(
        AppState::new(todos, auth, limiter)
            .with_trusted_proxy_headers(config.trust_proxy_headers),
    );

    let listener = tokio::net::TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address()))?;
    tracing::info!(address = %config.server.bind_address(), "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "Failed to listen for Ctrl+C");
    }
    tracing::info!("Shutting down gracefully...");
}
