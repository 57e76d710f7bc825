//! Incremental line-framed decoder
//!
//! Turns arbitrarily split text chunks into accumulated display text. A line
//! is never parsed before its terminator arrives; the unterminated tail stays
//! in `residual` until the next chunk (or `finish`).

use super::scanner::split_concatenated;
use serde::Deserialize;

/// Discriminator key whose presence marks a fragment as a broken frame
/// rather than literal text.
const DISCRIMINATOR: &str = "\"type\"";

/// Frame type that carries display content
const ITEM_TYPE: &str = "item";

/// One structured record from the upstream stream
#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<serde_json::Value>,
}

/// Decoder state for one chat turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSession {
    residual: String,
    accumulated: String,
    terminal: bool,
    skipped_fragments: u64,
}

impl StreamSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Display text reconstructed so far
    #[must_use]
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Unterminated tail carried into the next chunk
    #[must_use]
    pub fn residual(&self) -> &str {
        &self.residual
    }

    /// Whether the upstream stream has ended
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Fragments dropped because they looked like frames but did not parse
    #[must_use]
    pub fn skipped_fragments(&self) -> u64 {
        self.skipped_fragments
    }

    /// Consume one chunk and return the accumulated text after it.
    pub fn feed(&mut self, chunk: &str) -> &str {
        self.residual.push_str(chunk);

        if let Some(last_newline) = self.residual.rfind('\n') {
            let tail = self.residual.split_off(last_newline + 1);
            let ready = std::mem::replace(&mut self.residual, tail);
            for line in ready.lines() {
                self.process_line(line);
            }
        }

        &self.accumulated
    }

    /// Process whatever is left in the residual buffer as a final line and
    /// mark the session terminal.
    pub fn finish(&mut self) -> &str {
        if !self.terminal {
            let last = std::mem::take(&mut self.residual);
            self.process_line(last.strip_suffix('\r').unwrap_or(&last));
            self.terminal = true;
        }
        &self.accumulated
    }

    fn process_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        for fragment in split_concatenated(line) {
            if fragment.trim().is_empty() {
                continue;
            }
            self.process_fragment(fragment);
        }
    }

    fn process_fragment(&mut self, fragment: &str) {
        match serde_json::from_str::<Frame>(fragment.trim()) {
            Ok(frame) => {
                if frame.kind.as_deref() != Some(ITEM_TYPE) {
                    return;
                }
                if let Some(serde_json::Value::String(content)) = frame.content {
                    self.accumulated.push_str(&content);
                }
            }
            Err(e) if fragment.contains(DISCRIMINATOR) => {
                self.skipped_fragments += 1;
                tracing::debug!(
                    error = %e,
                    fragment_len = fragment.len(),
                    skipped = self.skipped_fragments,
                    "Dropping malformed frame"
                );
            }
            Err(_) => {
                // Not a frame at all: treat it as literal text.
                self.accumulated.push_str(fragment);
            }
        }
    }
}

/// Pure reducer form of [`StreamSession::feed`].
#[must_use]
pub fn reduce(mut session: StreamSession, chunk: &str) -> (StreamSession, String) {
    let emitted = session.feed(chunk).to_string();
    (session, emitted)
}
