//! Process configuration, resolved once at startup

use crate::auth::UserDirectory;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 120;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("RELAY_USERS is not a valid credential list: {0}")]
    InvalidUsers(#[from] serde_json::Error),
}

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub chat_webhook_url: Option<String>,
    pub files_webhook_url: Option<String>,
    pub read_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_upload_bytes: usize,
    pub users: UserDirectory,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            chat_webhook_url: None,
            files_webhook_url: None,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            users: UserDirectory::default(),
        }
    }
}

impl RelayConfig {
    /// Read the relay configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`RelayConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Fails when a numeric variable does not parse or `RELAY_USERS` is
    /// not a valid credential list.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let users = match non_blank(lookup("RELAY_USERS")) {
            Some(json) => UserDirectory::from_json(&json)?,
            None => UserDirectory::default(),
        };

        Ok(Self {
            port: parse_var(&lookup, "RELAY_PORT")?.unwrap_or(DEFAULT_PORT),
            chat_webhook_url: non_blank(lookup("CHAT_WEBHOOK_URL")),
            files_webhook_url: non_blank(lookup("FILES_WEBHOOK_URL")),
            read_timeout: Duration::from_secs(
                parse_var(&lookup, "RELAY_READ_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_READ_TIMEOUT_SECS),
            ),
            connect_timeout: Duration::from_secs(
                parse_var(&lookup, "RELAY_CONNECT_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            max_upload_bytes: parse_var(&lookup, "RELAY_MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            users,
        })
    }
}

/// Terminal client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub relay_url: String,
    pub pin: Option<String>,
    pub email: Option<String>,
    pub read_timeout: Duration,
}

impl ClientConfig {
    /// Read the client configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the client configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Fails when `RELAY_READ_TIMEOUT_SECS` is not a number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            relay_url: non_blank(lookup("CHAT_RELAY_URL"))
                .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
            pin: non_blank(lookup("CHAT_PIN")),
            email: non_blank(lookup("CHAT_EMAIL")),
            read_timeout: Duration::from_secs(
                parse_var(&lookup, "RELAY_READ_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_READ_TIMEOUT_SECS),
            ),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match non_blank(lookup(var)) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
