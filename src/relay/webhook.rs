//! Outbound calls to the configured webhooks

use super::ByteStream;
use crate::api::ChatRequest;
use crate::error::RelayError;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// Client for the chat and file upload webhooks
#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    chat_url: Option<String>,
    files_url: Option<String>,
    /// Bound on the wait for response headers
    response_timeout: Duration,
}

impl WebhookClient {
    /// Build a client for the given webhooks.
    ///
    /// `response_timeout` bounds the wait for each webhook's response
    /// headers; the streamed body is bounded separately per chunk.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the HTTP client cannot be built.
    pub fn new(
        chat_url: Option<String>,
        files_url: Option<String>,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> Result<Self, RelayError> {
        // No overall request timeout: chat replies stream for as long as the
        // assistant keeps producing. Reads are bounded per chunk by the relay.
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| RelayError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            chat_url,
            files_url,
            response_timeout,
        })
    }

    #[must_use]
    pub fn chat_configured(&self) -> bool {
        self.chat_url.is_some()
    }

    #[must_use]
    pub fn files_configured(&self) -> bool {
        self.files_url.is_some()
    }

    /// Forward a chat message and return the upstream body as a byte stream.
    ///
    /// # Errors
    ///
    /// `Configuration` when no chat webhook is set, `Transport` or `Timeout`
    /// when the webhook cannot be reached or does not answer in time,
    /// `UpstreamStatus` on a non-2xx answer and `NoContent` on an empty one.
    pub async fn forward_chat(&self, request: &ChatRequest) -> Result<ByteStream, RelayError> {
        let url = self
            .chat_url
            .as_deref()
            .ok_or_else(|| RelayError::configuration("Chat webhook URL is not configured"))?;

        let form = reqwest::multipart::Form::new()
            .text("userId", request.user_id.clone())
            .text("userName", request.user_name.clone())
            .text("message", request.message.clone());

        let response = self.send(self.client.post(url).multipart(form)).await?;
        let response = require_success(response).await?;

        if declares_empty_body(&response) {
            tracing::warn!(status = %response.status(), "Chat webhook returned no body");
            return Err(RelayError::no_content());
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(RelayError::from));
        Ok(Box::pin(stream))
    }

    /// Forward a buffered upload body unchanged, keeping its content type.
    ///
    /// # Errors
    ///
    /// Same classification as [`WebhookClient::forward_chat`], without
    /// `NoContent`.
    pub async fn forward_upload(
        &self,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), RelayError> {
        let url = self
            .files_url
            .as_deref()
            .ok_or_else(|| RelayError::configuration("File webhook URL is not configured"))?;

        let mut builder = self.client.post(url).body(body);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        let response = self.send(builder).await?;
        require_success(response).await.map(drop)
    }

    /// Send `request`, giving up when no response headers arrive in time.
    async fn send(&self, request: RequestBuilder) -> Result<Response, RelayError> {
        match tokio::time::timeout(self.response_timeout, request.send()).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.response_timeout.as_secs(),
                    "Webhook did not answer in time"
                );
                Err(RelayError::timeout(format!(
                    "No response from webhook within {}s",
                    self.response_timeout.as_secs()
                )))
            }
        }
    }
}

/// Turn a non-2xx response into an `UpstreamStatus` error carrying its body.
async fn require_success(response: Response) -> Result<Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(status = %status, body = %body, "Webhook error");
    Err(RelayError::upstream_status(status.as_u16(), body))
}

fn declares_empty_body(response: &Response) -> bool {
    response.status() == StatusCode::NO_CONTENT || response.content_length() == Some(0)
}
