//! Frame decoder for the chat reply stream
//!
//! The upstream emits newline-delimited `{"type":"item","content":...}`
//! records, but the framing is not reliable: records may arrive split across
//! chunks, glued together without a separator, or as bare text.

mod decoder;
mod scanner;

#[cfg(test)]
mod proptests;

pub use decoder::{reduce, StreamSession};
pub use scanner::split_concatenated;
