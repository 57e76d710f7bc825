//! Pass-through relay of an upstream byte stream
//!
//! The body is never materialized: each upstream chunk is decoded, re-encoded
//! and handed downstream as soon as it arrives. Memory is bounded by one
//! chunk plus at most three held-back bytes of an incomplete character.

use super::utf8::Utf8ChunkDecoder;
use crate::error::RelayError;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;

struct RelayState<S> {
    upstream: S,
    decoder: Utf8ChunkDecoder,
    forwarded: u64,
    done: bool,
}

impl<S> Drop for RelayState<S> {
    fn drop(&mut self) {
        if self.done {
            tracing::debug!(bytes = self.forwarded, "Relay stream closed");
        } else {
            tracing::debug!(
                bytes = self.forwarded,
                "Relay stream abandoned by consumer, releasing upstream"
            );
        }
    }
}

/// Relay `upstream` chunk by chunk.
///
/// Every read is bounded by `read_timeout`. An upstream error or timeout is
/// yielded once as an `Err` and ends the stream; dropping the returned stream
/// drops the upstream with it.
pub fn relay_stream<S, E>(
    upstream: S,
    read_timeout: Duration,
) -> impl Stream<Item = Result<Bytes, RelayError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display + Send,
{
    let state = RelayState {
        upstream,
        decoder: Utf8ChunkDecoder::new(),
        forwarded: 0,
        done: false,
    };

    stream::unfold(state, move |mut state| async move {
        if state.done {
            return None;
        }

        loop {
            match tokio::time::timeout(read_timeout, state.upstream.next()).await {
                Err(_) => {
                    state.done = true;
                    tracing::warn!(
                        timeout_secs = read_timeout.as_secs(),
                        bytes = state.forwarded,
                        "Upstream read timed out"
                    );
                    let err = RelayError::timeout(format!(
                        "No data from upstream within {}s",
                        read_timeout.as_secs()
                    ));
                    return Some((Err(err), state));
                }
                Ok(Some(Ok(bytes))) => {
                    let text = state.decoder.decode(&bytes);
                    if text.is_empty() {
                        continue;
                    }
                    state.forwarded += text.len() as u64;
                    return Some((Ok(Bytes::from(text)), state));
                }
                Ok(Some(Err(e))) => {
                    state.done = true;
                    tracing::error!(error = %e, bytes = state.forwarded, "Streaming error");
                    let err = RelayError::stream(format!("Error in upstream stream: {e}"));
                    return Some((Err(err), state));
                }
                Ok(None) => {
                    state.done = true;
                    let tail = state.decoder.finish();
                    if tail.is_empty() {
                        return None;
                    }
                    state.forwarded += tail.len() as u64;
                    return Some((Ok(Bytes::from(tail)), state));
                }
            }
        }
    })
}
