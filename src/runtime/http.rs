//! HTTP client for a running relay

use super::traits::ChatClient;
use crate::api::{ChatRequest, LoginResponse};
use crate::auth::User;
use crate::error::RelayError;
use crate::relay::ByteStream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// `ChatClient` that talks to the relay's `/api/*` endpoints
#[derive(Clone)]
pub struct HttpChatClient {
    client: Client,
    base_url: String,
}

impl HttpChatClient {
    /// Client for the relay at `base_url`.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RelayError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RelayError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Exchange a PIN (and optional email) for the user identity.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` (with the status) when the relay refuses the
    /// credentials, `UpstreamStatus` on any other failure status and
    /// `Transport` when the relay cannot be reached.
    pub async fn login(&self, email: Option<&str>, pin: &str) -> Result<User, RelayError> {
        let response = self
            .client
            .post(format!("{}/api/login", self.base_url))
            .json(&json!({ "pin": pin, "email": email }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match status {
            StatusCode::OK | StatusCode::UNAUTHORIZED => {
                let login: LoginResponse = serde_json::from_str(&body).map_err(|e| {
                    RelayError::stream(format!("Unexpected login response: {e}")).with_details(body)
                })?;
                match login.user {
                    Some(user) if login.success => Ok(user),
                    _ => Err(RelayError::invalid_request(
                        login.error.unwrap_or_else(|| "Login rejected".to_string()),
                    )
                    .with_status(status.as_u16())),
                }
            }
            _ => Err(RelayError::upstream_status(status.as_u16(), body)),
        }
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, RelayError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Relay rejected chat message");
            return Err(RelayError::upstream_status(status.as_u16(), body));
        }
        if response.content_length() == Some(0) {
            return Err(RelayError::no_content());
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(RelayError::from));
        Ok(Box::pin(stream))
    }
}
