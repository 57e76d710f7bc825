//! Events that drive a chat turn

use crate::error::RelayErrorKind;
use crate::session::MessageId;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
///
/// Ids and timestamps are chosen by the caller so the transition itself
/// stays pure.
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit {
        text: String,
        user_message_id: MessageId,
        bot_message_id: MessageId,
        at: DateTime<Utc>,
    },

    // Stream events, tagged with the turn's bot message
    ChunkReceived {
        bot_id: MessageId,
        text: String,
        at: DateTime<Utc>,
    },
    StreamEnded {
        bot_id: MessageId,
    },
    StreamFailed {
        bot_id: MessageId,
        error_kind: RelayErrorKind,
        message: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    #[must_use]
    pub fn submit(text: impl Into<String>) -> Self {
        Event::UserSubmit {
            text: text.into(),
            user_message_id: MessageId::new(),
            bot_message_id: MessageId::new(),
            at: Utc::now(),
        }
    }
}
