//! HTTP API for the chat relay
//!
//! `/api/chat` streams the assistant reply; `/api/files` and `/api/login` are
//! plain buffer-and-forward endpoints.

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::auth::UserDirectory;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::relay::WebhookClient;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub webhooks: WebhookClient,
    pub users: Arc<UserDirectory>,
    pub read_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Build the shared state from the resolved configuration.
    ///
    /// # Errors
    ///
    /// Fails when the outbound HTTP client cannot be built.
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let webhooks = WebhookClient::new(
            config.chat_webhook_url.clone(),
            config.files_webhook_url.clone(),
            config.connect_timeout,
            config.read_timeout,
        )?;

        Ok(Self {
            webhooks,
            users: Arc::new(config.users.clone()),
            read_timeout: config.read_timeout,
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}
