//! Relay error types

use thiserror::Error;

/// Relay error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RelayError {
    pub kind: RelayErrorKind,
    pub message: String,
    /// Upstream HTTP status, when the failure came from a response
    pub status: Option<u16>,
    /// Upstream response body or lower-level error text
    pub details: Option<String>,
}

impl RelayError {
    #[must_use]
    pub fn new(kind: RelayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::Configuration, message)
    }

    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::InvalidRequest, message)
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::Transport, message)
    }

    #[must_use]
    pub fn upstream_status(status: u16, body: impl Into<String>) -> Self {
        Self::new(
            RelayErrorKind::UpstreamStatus,
            format!("Upstream responded with status {status}"),
        )
        .with_status(status)
        .with_details(body)
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::new(RelayErrorKind::NoContent, "No response from webhook service")
    }

    #[must_use]
    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::Stream, message)
    }

    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::Timeout, message)
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RelayError::timeout(format!("Request timed out: {e}"))
        } else if e.is_connect() {
            RelayError::transport(format!("Connection error: {e}"))
        } else if e.is_body() || e.is_decode() {
            RelayError::stream(format!("Error in HTTP stream: {e}"))
        } else {
            RelayError::transport(format!("Request failed: {e}"))
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayErrorKind {
    /// A required webhook URL is missing
    Configuration,
    /// Wrong method, empty or unparseable body
    InvalidRequest,
    /// Network failure reaching the upstream
    Transport,
    /// Upstream answered with a non-success status
    UpstreamStatus,
    /// Upstream answered without a body
    NoContent,
    /// The upstream body broke off mid-stream
    Stream,
    /// No chunk arrived within the read timeout
    Timeout,
}
