//! Chat Relay server
//!
//! Serves `/api/chat`, `/api/files` and `/api/login` in front of the
//! configured webhooks.

use chat_relay::api::{create_router, AppState};
use chat_relay::config::RelayConfig;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = RelayConfig::from_env()?;

    if config.chat_webhook_url.is_none() {
        tracing::warn!("CHAT_WEBHOOK_URL is not set, /api/chat will answer 500");
    }
    if config.files_webhook_url.is_none() {
        tracing::warn!("FILES_WEBHOOK_URL is not set, /api/files will answer 500");
    }
    if config.users.is_empty() {
        tracing::warn!("No users configured. Set RELAY_USERS to allow logins.");
    } else {
        tracing::info!(users = config.users.len(), "User directory loaded");
    }

    // Create application state
    let state = AppState::new(&config)?;

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        read_timeout_secs = config.read_timeout.as_secs(),
        "Chat relay listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
