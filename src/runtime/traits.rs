//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::api::ChatRequest;
use crate::error::RelayError;
use crate::relay::ByteStream;
use async_trait::async_trait;
use std::sync::Arc;

/// Client that opens a reply stream for a chat message
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send the message and return the raw reply body as it arrives
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, RelayError>;
}

#[async_trait]
impl<T: ChatClient + ?Sized> ChatClient for Arc<T> {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, RelayError> {
        (**self).open_stream(request).await
    }
}
