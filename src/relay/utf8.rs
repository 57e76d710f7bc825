//! Streaming UTF-8 decoding
//!
//! Chunk boundaries from the network do not respect character boundaries.
//! An incomplete multi-byte sequence at the end of a chunk is held back and
//! completed by the next chunk instead of being decoded as garbage.

/// Stateful UTF-8 decoder for a sequence of byte chunks
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, returning every character that is complete so far.
    ///
    /// Invalid sequences decode to U+FFFD. A trailing sequence that is merely
    /// incomplete is kept for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let buffered = std::mem::take(&mut self.pending);

        let mut out = String::with_capacity(buffered.len());
        let mut input = buffered.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, after) = input.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = after.get(len..).unwrap_or_default();
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush any bytes still held back at end of stream.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let rest = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&rest).into_owned()
    }

    /// Number of bytes waiting for the rest of their character
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
