//! In-memory chat log for one session
//!
//! The log only grows: messages are appended as a user/bot pair and later
//! located by id to be updated in place. History is never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Stable message identifier, unique within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_loading: bool,
}

impl ChatMessage {
    #[must_use]
    pub fn user(id: MessageId, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            sender: Sender::User,
            text: text.into(),
            timestamp,
            is_loading: false,
        }
    }

    /// Empty bot message shown while the reply streams in
    #[must_use]
    pub fn placeholder(id: MessageId, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            sender: Sender::Bot,
            text: String::new(),
            timestamp,
            is_loading: true,
        }
    }

    #[must_use]
    pub fn bot(id: MessageId, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            sender: Sender::Bot,
            text: text.into(),
            timestamp,
            is_loading: false,
        }
    }
}

/// Ordered message log with id lookup
#[derive(Debug, Default)]
pub struct SessionStore {
    messages: Vec<ChatMessage>,
    index: HashMap<MessageId, usize>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a bot greeting
    #[must_use]
    pub fn with_greeting(text: impl Into<String>) -> Self {
        let mut store = Self::new();
        store.push(ChatMessage::bot(MessageId::new(), text, Utc::now()));
        store
    }

    /// Append a user message and its bot placeholder in one step.
    pub fn append_pair(&mut self, user: ChatMessage, bot: ChatMessage) {
        debug_assert_eq!(user.sender, Sender::User);
        debug_assert_eq!(bot.sender, Sender::Bot);
        self.push(user);
        self.push(bot);
    }

    /// Apply `update` to the message with `id`, returning the updated message.
    pub fn update(
        &mut self,
        id: MessageId,
        update: impl FnOnce(&mut ChatMessage),
    ) -> Option<&ChatMessage> {
        let idx = *self.index.get(&id)?;
        let message = self.messages.get_mut(idx)?;
        update(&mut *message);
        Some(&*message)
    }

    #[must_use]
    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.index.get(&id).and_then(|&idx| self.messages.get(idx))
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn push(&mut self, message: ChatMessage) {
        self.index.insert(message.id, self.messages.len());
        self.messages.push(message);
    }
}
