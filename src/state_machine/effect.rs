//! Effects produced by state transitions

use crate::api::ChatRequest;
use crate::error::RelayErrorKind;
use crate::session::{ChatMessage, MessageId};
use chrono::{DateTime, Utc};

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed {
        error_kind: RelayErrorKind,
        message: String,
    },
}

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Append the user message and the bot placeholder together
    AppendPair { user: ChatMessage, bot: ChatMessage },

    /// Send the chat request and start reading the reply stream
    OpenRequest {
        bot_id: MessageId,
        request: ChatRequest,
    },

    /// Overwrite the bot message text while it is still loading
    UpdateBotMessage {
        id: MessageId,
        text: String,
        timestamp: DateTime<Utc>,
    },

    /// Write the final text and clear the loading flag
    FinalizeBotMessage { id: MessageId, text: String },

    /// Replace the bot message with failure text and clear the loading flag
    FailBotMessage {
        id: MessageId,
        text: String,
        timestamp: DateTime<Utc>,
    },

    /// Drop the reply stream reader, if one is still running
    ReleaseStream,

    /// Tell subscribers the turn reached a terminal state
    NotifyTurnFinished {
        bot_id: MessageId,
        outcome: TurnOutcome,
    },
}

impl Effect {
    #[must_use]
    pub fn turn_completed(bot_id: MessageId) -> Self {
        Effect::NotifyTurnFinished {
            bot_id,
            outcome: TurnOutcome::Completed,
        }
    }

    #[must_use]
    pub fn turn_failed(bot_id: MessageId, error_kind: RelayErrorKind, message: String) -> Self {
        Effect::NotifyTurnFinished {
            bot_id,
            outcome: TurnOutcome::Failed {
                error_kind,
                message,
            },
        }
    }
}
