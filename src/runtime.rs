//! Runtime for a client-side chat session
//!
//! A `ChatSession` owns one background `TurnRuntime` task. The task applies
//! state-machine transitions, executes their effects against the shared
//! message log and broadcasts what changed.

mod executor;
mod http;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::TurnRuntime;
pub use http::HttpChatClient;
pub use traits::*;

use crate::auth::User;
use crate::session::{ChatMessage, MessageId, SessionStore};
use crate::state_machine::{Event, TurnContext, TurnOutcome};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Changes pushed to session subscribers
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// A user message and its loading bot placeholder were added
    Appended { user: ChatMessage, bot: ChatMessage },
    /// A bot message changed (streamed text, final text or failure text)
    Updated { message: ChatMessage },
    TurnFinished {
        bot_id: MessageId,
        outcome: TurnOutcome,
    },
    /// A submission was refused and nothing was appended
    Rejected { reason: String },
}

#[derive(Debug, Error)]
#[error("Chat session has shut down")]
pub struct SessionClosed;

/// Handle to a running chat session
///
/// Dropping the handle stops the runtime and releases any in-flight stream.
pub struct ChatSession {
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
    store: Arc<RwLock<SessionStore>>,
    shutdown: CancellationToken,
}

impl ChatSession {
    /// Spawn the runtime for `user`. Must be called inside a tokio runtime.
    #[must_use]
    pub fn start<C>(
        user: User,
        client: C,
        greeting: Option<String>,
        read_timeout: Duration,
    ) -> Self
    where
        C: ChatClient + 'static,
    {
        let store = match greeting {
            Some(text) => SessionStore::with_greeting(text),
            None => SessionStore::new(),
        };
        let store = Arc::new(RwLock::new(store));
        let (event_tx, event_rx) = mpsc::channel(64);
        let (broadcast_tx, _) = broadcast::channel(256);
        let shutdown = CancellationToken::new();

        let runtime = TurnRuntime::new(
            TurnContext::new(user),
            client,
            store.clone(),
            event_rx,
            event_tx.clone(),
            broadcast_tx.clone(),
            shutdown.clone(),
            read_timeout,
        );
        tokio::spawn(runtime.run());

        Self {
            event_tx,
            broadcast_tx,
            store,
            shutdown,
        }
    }

    /// Queue a message for sending.
    ///
    /// The outcome is reported to subscribers: `Appended` when the turn
    /// starts, `Rejected` when another turn is still active or the text is
    /// blank.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` once the session has shut down.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.event_tx
            .send(Event::submit(text))
            .await
            .map_err(|_| SessionClosed)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.broadcast_tx.subscribe()
    }

    /// Snapshot of the message log
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.store.read().await.messages().to_vec()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
