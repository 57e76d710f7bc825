//! Chat turn runtime executor

use super::traits::ChatClient;
use super::SessionUpdate;

use crate::api::ChatRequest;
use crate::error::RelayError;
use crate::relay::Utf8ChunkDecoder;
use crate::session::{ChatMessage, MessageId, SessionStore};
use crate::state_machine::{transition, Effect, Event, TransitionError, TurnContext, TurnState};
use chrono::Utc;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Runtime that owns the turn state of one chat session
pub struct TurnRuntime<C>
where
    C: ChatClient + 'static,
{
    context: TurnContext,
    state: TurnState,
    client: Arc<C>,
    store: Arc<RwLock<SessionStore>>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
    /// Stops the run loop
    shutdown: CancellationToken,
    /// Token to cancel the running reply reader
    stream_cancel_token: Option<CancellationToken>,
    read_timeout: Duration,
}

impl<C> TurnRuntime<C>
where
    C: ChatClient + 'static,
{
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        context: TurnContext,
        client: C,
        store: Arc<RwLock<SessionStore>>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<SessionUpdate>,
        shutdown: CancellationToken,
        read_timeout: Duration,
    ) -> Self {
        Self {
            context,
            state: TurnState::Idle,
            client: Arc::new(client),
            store,
            event_rx,
            event_tx,
            broadcast_tx,
            shutdown,
            stream_cancel_token: None,
            read_timeout,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(user_id = %self.context.user.id, "Starting chat session runtime");

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                Some(event) = self.event_rx.recv() => {
                    if let Err(e) = self.process_event(event).await {
                        tracing::info!(reason = %e, state = self.state.name(), "Event rejected");
                    }
                }

                else => break,
            }
        }

        // Whatever is still streaming belongs to nobody now
        if let Some(token) = self.stream_cancel_token.take() {
            token.cancel();
        }
        tracing::info!(user_id = %self.context.user.id, "Chat session runtime stopped");
    }

    async fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(TransitionError::StaleEvent(bot_id)) => {
                tracing::debug!(bot_id = %bot_id, "Dropping event from a finished turn");
                return Ok(());
            }
            Err(e) => {
                // Rejections are user-facing (e.g. "reply still streaming")
                let _ = self.broadcast_tx.send(SessionUpdate::Rejected {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let old_state = std::mem::replace(&mut self.state, result.new_state);
        if old_state.name() != self.state.name() {
            tracing::debug!(
                from = old_state.name(),
                to = self.state.name(),
                "Turn state changed"
            );
        }

        for effect in result.effects {
            self.execute_effect(effect).await;
        }

        Ok(())
    }

    async fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendPair { user, bot } => {
                self.store
                    .write()
                    .await
                    .append_pair(user.clone(), bot.clone());
                let _ = self
                    .broadcast_tx
                    .send(SessionUpdate::Appended { user, bot });
            }

            Effect::OpenRequest { bot_id, request } => {
                if let Some(previous) = self.stream_cancel_token.take() {
                    previous.cancel();
                }
                let cancel_token = CancellationToken::new();
                self.stream_cancel_token = Some(cancel_token.clone());

                tokio::spawn(read_reply(
                    self.client.clone(),
                    request,
                    bot_id,
                    self.event_tx.clone(),
                    cancel_token,
                    self.read_timeout,
                ));
            }

            Effect::UpdateBotMessage {
                id,
                text,
                timestamp,
            } => {
                self.update_message(id, |m| {
                    m.text = text;
                    m.timestamp = timestamp;
                })
                .await;
            }

            Effect::FinalizeBotMessage { id, text } => {
                // The reader has already returned
                self.stream_cancel_token = None;
                self.update_message(id, |m| {
                    m.text = text;
                    m.is_loading = false;
                })
                .await;
            }

            Effect::FailBotMessage {
                id,
                text,
                timestamp,
            } => {
                self.update_message(id, |m| {
                    m.text = text;
                    m.timestamp = timestamp;
                    m.is_loading = false;
                })
                .await;
            }

            Effect::ReleaseStream => {
                if let Some(token) = self.stream_cancel_token.take() {
                    token.cancel();
                }
            }

            Effect::NotifyTurnFinished { bot_id, outcome } => {
                tracing::info!(bot_id = %bot_id, outcome = ?outcome, "Turn finished");
                let _ = self
                    .broadcast_tx
                    .send(SessionUpdate::TurnFinished { bot_id, outcome });
            }
        }
    }

    async fn update_message(&self, id: MessageId, update: impl FnOnce(&mut ChatMessage)) {
        let updated = self.store.write().await.update(id, update).cloned();
        match updated {
            Some(message) => {
                let _ = self.broadcast_tx.send(SessionUpdate::Updated { message });
            }
            None => tracing::warn!(message_id = %id, "Update for unknown message"),
        }
    }
}

/// Background reader for one reply stream.
///
/// Reports progress back to the runtime as events; stays silent once
/// cancelled.
async fn read_reply<C: ChatClient + ?Sized>(
    client: Arc<C>,
    request: ChatRequest,
    bot_id: MessageId,
    event_tx: mpsc::Sender<Event>,
    cancel_token: CancellationToken,
    read_timeout: Duration,
) {
    let event = tokio::select! {
        biased;

        () = cancel_token.cancelled() => {
            tracing::debug!(bot_id = %bot_id, "Reply stream released");
            return;
        }

        event = pump_reply(client.as_ref(), &request, bot_id, &event_tx, read_timeout) => event,
    };

    let _ = event_tx.send(event).await;
}

/// Forward decoded chunks until the stream ends, returning the terminal event.
async fn pump_reply<C: ChatClient + ?Sized>(
    client: &C,
    request: &ChatRequest,
    bot_id: MessageId,
    event_tx: &mpsc::Sender<Event>,
    read_timeout: Duration,
) -> Event {
    // The wait for response headers is bounded like every chunk read
    let opened = tokio::time::timeout(read_timeout, client.open_stream(request)).await;
    let mut stream = match opened {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return stream_failed(bot_id, &e),
        Err(_) => {
            let e = RelayError::timeout(format!(
                "No response within {}s",
                read_timeout.as_secs()
            ));
            return stream_failed(bot_id, &e);
        }
    };

    let mut decoder = Utf8ChunkDecoder::new();
    loop {
        let chunk = match tokio::time::timeout(read_timeout, stream.next()).await {
            Err(_) => {
                let e = RelayError::timeout(format!(
                    "No data received for {}s",
                    read_timeout.as_secs()
                ));
                return stream_failed(bot_id, &e);
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => return stream_failed(bot_id, &e),
            Ok(Some(Ok(bytes))) => bytes,
        };

        let text = decoder.decode(&chunk);
        if text.is_empty() {
            continue;
        }
        let event = Event::ChunkReceived {
            bot_id,
            text,
            at: Utc::now(),
        };
        if event_tx.send(event).await.is_err() {
            // Runtime is gone
            return Event::StreamEnded { bot_id };
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() {
        let _ = event_tx
            .send(Event::ChunkReceived {
                bot_id,
                text: tail,
                at: Utc::now(),
            })
            .await;
    }

    Event::StreamEnded { bot_id }
}

fn stream_failed(bot_id: MessageId, error: &RelayError) -> Event {
    tracing::warn!(
        bot_id = %bot_id,
        kind = ?error.kind,
        error = %error,
        "Reply stream failed"
    );
    Event::StreamFailed {
        bot_id,
        error_kind: error.kind,
        message: error.message.clone(),
        at: Utc::now(),
    }
}
