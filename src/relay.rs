//! Stream relay between the chat webhook and the browser
//!
//! The webhook's streaming response is forwarded without buffering; see
//! [`relay_stream`] for the pass-through contract.

mod stream;
mod utf8;
mod webhook;

pub use stream::relay_stream;
pub use utf8::Utf8ChunkDecoder;
pub use webhook::WebhookClient;

use crate::error::RelayError;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Boxed stream of body chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>;
