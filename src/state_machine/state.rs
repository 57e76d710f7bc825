//! Chat turn state types

use crate::auth::User;
use crate::frame::StreamSession;
use crate::session::MessageId;

/// Text shown in place of the reply when a turn fails.
///
/// Partial text received before the failure is discarded, so a truncated
/// answer is never presented as if it were complete.
pub const CONNECTION_FAILURE_TEXT: &str =
    "There was an error connecting to the server. Please try again later.";

/// Immutable context shared by every turn of a session
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub user: User,
}

impl TurnContext {
    #[must_use]
    pub fn new(user: User) -> Self {
        Self { user }
    }
}

/// Lifecycle of the current (or most recent) turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TurnState {
    /// No turn has been submitted yet
    #[default]
    Idle,
    /// Message pair appended, request open, no reply bytes yet
    Pending { bot_id: MessageId },
    /// Reply is arriving; the session holds decoder state
    Streaming {
        bot_id: MessageId,
        session: StreamSession,
    },
    /// Upstream closed normally and the reply is final
    Finalized { bot_id: MessageId },
    /// The turn failed; the bot message shows the failure text
    Errored { bot_id: MessageId, message: String },
}

impl TurnState {
    /// Whether a turn is in flight. Only one may be at a time.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, TurnState::Pending { .. } | TurnState::Streaming { .. })
    }

    /// Bot message of the current or most recent turn
    #[must_use]
    pub fn bot_id(&self) -> Option<MessageId> {
        match self {
            TurnState::Idle => None,
            TurnState::Pending { bot_id }
            | TurnState::Streaming { bot_id, .. }
            | TurnState::Finalized { bot_id }
            | TurnState::Errored { bot_id, .. } => Some(*bot_id),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::Pending { .. } => "pending",
            TurnState::Streaming { .. } => "streaming",
            TurnState::Finalized { .. } => "finalized",
            TurnState::Errored { .. } => "errored",
        }
    }
}
