//! Pure state transition function

use super::{Effect, Event, TurnContext, TurnState, CONNECTION_FAILURE_TEXT};
use crate::api::ChatRequest;
use crate::frame::StreamSession;
use crate::session::{ChatMessage, MessageId};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    #[must_use]
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A reply is still streaming, wait for it to finish")]
    TurnInProgress,
    #[error("Cannot send an empty message")]
    EmptyMessage,
    #[error("Event for turn {0} arrived after that turn ended")]
    StaleEvent(MessageId),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; all I/O is
/// described by the returned effects.
///
/// # Errors
///
/// Returns `TurnInProgress` for a submission during an active turn,
/// `EmptyMessage` for a blank one and `StaleEvent` for stream events
/// that do not belong to the active turn.
pub fn transition(
    state: &TurnState,
    context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Submission
        // ============================================================

        // Busy states + UserSubmit -> Reject, nothing is appended
        (TurnState::Pending { .. } | TurnState::Streaming { .. }, Event::UserSubmit { .. }) => {
            Err(TransitionError::TurnInProgress)
        }

        // Idle/terminal + UserSubmit -> Pending
        (
            TurnState::Idle | TurnState::Finalized { .. } | TurnState::Errored { .. },
            Event::UserSubmit {
                text,
                user_message_id,
                bot_message_id,
                at,
            },
        ) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }

            let request = ChatRequest {
                user_id: context.user.id.clone(),
                user_name: context.user.name.clone(),
                message: text.to_string(),
            };

            Ok(TransitionResult::new(TurnState::Pending {
                bot_id: bot_message_id,
            })
            .with_effect(Effect::AppendPair {
                user: ChatMessage::user(user_message_id, text, at),
                bot: ChatMessage::placeholder(bot_message_id, at),
            })
            .with_effect(Effect::OpenRequest {
                bot_id: bot_message_id,
                request,
            }))
        }

        // ============================================================
        // Streaming
        // ============================================================

        // Pending + first chunk -> Streaming
        (TurnState::Pending { bot_id }, Event::ChunkReceived { bot_id: id, text, at })
            if *bot_id == id =>
        {
            Ok(apply_chunk(*bot_id, StreamSession::new(), &text, at))
        }

        // Streaming + chunk -> Streaming with more text
        (TurnState::Streaming { bot_id, session }, Event::ChunkReceived { bot_id: id, text, at })
            if *bot_id == id =>
        {
            Ok(apply_chunk(*bot_id, session.clone(), &text, at))
        }

        // ============================================================
        // Terminal transitions
        // ============================================================

        // Pending/Streaming + StreamEnded -> Finalized (last pass over the residual)
        (TurnState::Pending { bot_id }, Event::StreamEnded { bot_id: id }) if *bot_id == id => {
            Ok(finalize(*bot_id, StreamSession::new()))
        }
        (TurnState::Streaming { bot_id, session }, Event::StreamEnded { bot_id: id })
            if *bot_id == id =>
        {
            Ok(finalize(*bot_id, session.clone()))
        }

        // Pending/Streaming + StreamFailed -> Errored (partial text discarded)
        (
            TurnState::Pending { bot_id } | TurnState::Streaming { bot_id, .. },
            Event::StreamFailed {
                bot_id: id,
                error_kind,
                message,
                at,
            },
        ) if *bot_id == id => Ok(TransitionResult::new(TurnState::Errored {
            bot_id: *bot_id,
            message: message.clone(),
        })
        .with_effect(Effect::ReleaseStream)
        .with_effect(Effect::FailBotMessage {
            id: *bot_id,
            text: CONNECTION_FAILURE_TEXT.to_string(),
            timestamp: at,
        })
        .with_effect(Effect::turn_failed(*bot_id, error_kind, message))),

        // Anything else is a leftover from a turn that already ended
        (
            _,
            Event::ChunkReceived { bot_id, .. }
            | Event::StreamEnded { bot_id }
            | Event::StreamFailed { bot_id, .. },
        ) => Err(TransitionError::StaleEvent(bot_id)),
    }
}

fn apply_chunk(
    bot_id: MessageId,
    mut session: StreamSession,
    text: &str,
    at: chrono::DateTime<chrono::Utc>,
) -> TransitionResult {
    let accumulated = session.feed(text).to_string();
    TransitionResult::new(TurnState::Streaming { bot_id, session }).with_effect(
        Effect::UpdateBotMessage {
            id: bot_id,
            text: accumulated,
            timestamp: at,
        },
    )
}

fn finalize(bot_id: MessageId, mut session: StreamSession) -> TransitionResult {
    let text = session.finish().to_string();
    if session.skipped_fragments() > 0 {
        tracing::debug!(
            bot_id = %bot_id,
            skipped = session.skipped_fragments(),
            "Turn finished with dropped frames"
        );
    }
    TransitionResult::new(TurnState::Finalized { bot_id })
        .with_effect(Effect::FinalizeBotMessage { id: bot_id, text })
        .with_effect(Effect::turn_completed(bot_id))
}
