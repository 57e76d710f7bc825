//! Mock implementations for testing
//!
//! These mocks drive the session runtime without a relay or network.

use super::traits::ChatClient;
use crate::api::ChatRequest;
use crate::error::RelayError;
use crate::relay::ByteStream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Reply the mock hands out for the next `open_stream` call
pub enum ScriptedReply {
    /// Fixed sequence of chunks (or errors), then end of stream
    Chunks(Vec<Result<Bytes, RelayError>>),
    /// The request itself fails
    OpenError(RelayError),
    /// Chunks pushed by the test through a channel; closing it ends the stream
    Channel(mpsc::Receiver<Result<Bytes, RelayError>>),
    /// A stream that never yields
    Silent,
    /// The request is accepted but never answered
    Unanswered,
}

/// Mock chat client that returns queued replies
pub struct MockChatClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, reply: ScriptedReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Queue a reply made of the given raw chunks
    pub fn queue_chunks(&self, chunks: &[&str]) {
        let items = chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect();
        self.queue(ScriptedReply::Chunks(items));
    }

    /// Queue a reply that delivers `chunks` and then breaks off with `error`
    pub fn queue_failure_after(&self, chunks: &[&str], error: RelayError) {
        let mut items: Vec<Result<Bytes, RelayError>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect();
        items.push(Err(error));
        self.queue(ScriptedReply::Chunks(items));
    }

    pub fn queue_open_error(&self, error: RelayError) {
        self.queue(ScriptedReply::OpenError(error));
    }

    /// Queue a channel-fed reply and return its sender
    pub fn queue_channel(&self) -> mpsc::Sender<Result<Bytes, RelayError>> {
        let (tx, rx) = mpsc::channel(16);
        self.queue(ScriptedReply::Channel(rx));
        tx
    }

    #[must_use]
    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, RelayError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RelayError::transport("No mock reply queued"))?;

        match reply {
            ScriptedReply::Chunks(items) => Ok(Box::pin(stream::iter(items))),
            ScriptedReply::OpenError(e) => Err(e),
            ScriptedReply::Channel(rx) => Ok(Box::pin(ReceiverStream::new(rx))),
            ScriptedReply::Silent => {
                Ok(Box::pin(stream::pending::<Result<Bytes, RelayError>>()))
            }
            ScriptedReply::Unanswered => std::future::pending().await,
        }
    }
}

// ============================================================================
// Session runtime tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;
    use crate::error::RelayErrorKind;
    use crate::runtime::{ChatSession, SessionUpdate};
    use crate::session::{MessageId, Sender};
    use crate::state_machine::{TurnOutcome, CONNECTION_FAILURE_TEXT};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;

    const WAIT: Duration = Duration::from_secs(60);
    const READ_TIMEOUT: Duration = Duration::from_secs(30);

    fn user() -> User {
        User {
            id: "user1".into(),
            name: "Gerard".into(),
        }
    }

    fn frame(text: &str) -> String {
        format!("{}\n", serde_json::json!({ "type": "item", "content": text }))
    }

    fn start(client: &Arc<MockChatClient>, greeting: Option<&str>) -> ChatSession {
        ChatSession::start(
            user(),
            client.clone(),
            greeting.map(str::to_string),
            READ_TIMEOUT,
        )
    }

    async fn next_update(rx: &mut broadcast::Receiver<SessionUpdate>) -> SessionUpdate {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for a session update")
            .expect("session update channel closed")
    }

    async fn wait_finished(rx: &mut broadcast::Receiver<SessionUpdate>) -> (MessageId, TurnOutcome) {
        loop {
            if let SessionUpdate::TurnFinished { bot_id, outcome } = next_update(rx).await {
                return (bot_id, outcome);
            }
        }
    }

    async fn wait_appended(rx: &mut broadcast::Receiver<SessionUpdate>) -> MessageId {
        loop {
            if let SessionUpdate::Appended { bot, .. } = next_update(rx).await {
                return bot.id;
            }
        }
    }

    #[tokio::test]
    async fn test_mock_chat_client() {
        let mock = MockChatClient::new();
        mock.queue_open_error(RelayError::no_content());

        let request = ChatRequest {
            user_id: "u".into(),
            user_name: "n".into(),
            message: "Hi".into(),
        };
        let err = mock.open_stream(&request).await.err().unwrap();
        assert_eq!(err.kind, RelayErrorKind::NoContent);

        // Nothing left in the queue
        let err = mock.open_stream(&request).await.err().unwrap();
        assert_eq!(err.kind, RelayErrorKind::Transport);
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_streamed_reply_is_accumulated() {
        let client = Arc::new(MockChatClient::new());
        client.queue_chunks(&[&frame("Hello "), &frame("there!")]);

        let session = start(&client, Some("Hi! How can I help?"));
        let mut rx = session.subscribe();
        session.submit("Hi").await.unwrap();

        let (bot_id, outcome) = wait_finished(&mut rx).await;
        assert_eq!(outcome, TurnOutcome::Completed);

        let messages = session.messages().await;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].sender, Sender::Bot);
        assert_eq!(messages[0].text, "Hi! How can I help?");
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(messages[1].text, "Hi");
        assert_eq!(messages[2].id, bot_id);
        assert_eq!(messages[2].text, "Hello there!");
        assert!(!messages[2].is_loading);

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user_id, "user1");
        assert_eq!(requests[0].user_name, "Gerard");
        assert_eq!(requests[0].message, "Hi");
    }

    #[tokio::test]
    async fn test_frames_split_across_chunks() {
        let client = Arc::new(MockChatClient::new());
        // Last frame has no trailing newline; it is picked up when the stream ends
        client.queue_chunks(&[
            "{\"type\":\"item\",\"con",
            "tent\":\"Hel\"}\n{\"type\":\"item\",\"content\":\"lo\"}",
        ]);

        let session = start(&client, None);
        let mut rx = session.subscribe();
        session.submit("Hi").await.unwrap();
        wait_finished(&mut rx).await;

        let messages = session.messages().await;
        assert_eq!(messages[1].text, "Hello");
    }

    #[tokio::test]
    async fn test_updates_only_grow() {
        let client = Arc::new(MockChatClient::new());
        let tx = client.queue_channel();

        let session = start(&client, None);
        let mut rx = session.subscribe();
        session.submit("Tell me a story").await.unwrap();
        wait_appended(&mut rx).await;

        for word in ["Once ", "upon ", "a ", "time"] {
            tx.send(Ok(Bytes::from(frame(word)))).await.unwrap();
        }
        drop(tx);

        let mut texts = Vec::new();
        loop {
            match next_update(&mut rx).await {
                SessionUpdate::Updated { message } => texts.push(message.text),
                SessionUpdate::TurnFinished { .. } => break,
                other => panic!("unexpected update {other:?}"),
            }
        }

        assert_eq!(texts.last().map(String::as_str), Some("Once upon a time"));
        for pair in texts.windows(2) {
            assert!(pair[1].starts_with(&pair[0]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[tokio::test]
    async fn test_submit_while_streaming_is_rejected() {
        let client = Arc::new(MockChatClient::new());
        let tx = client.queue_channel();

        let session = start(&client, None);
        let mut rx = session.subscribe();
        session.submit("first").await.unwrap();
        wait_appended(&mut rx).await;

        session.submit("second").await.unwrap();
        match next_update(&mut rx).await {
            SessionUpdate::Rejected { reason } => assert!(!reason.is_empty()),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(session.messages().await.len(), 2);

        tx.send(Ok(Bytes::from(frame("done")))).await.unwrap();
        drop(tx);
        wait_finished(&mut rx).await;

        // Accepted again once the turn is over
        client.queue_chunks(&[&frame("again")]);
        session.submit("third").await.unwrap();
        wait_finished(&mut rx).await;

        let texts: Vec<String> = session
            .messages()
            .await
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["first", "done", "third", "again"]);
        assert_eq!(client.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_submission_is_rejected() {
        let client = Arc::new(MockChatClient::new());
        let session = start(&client, None);
        let mut rx = session.subscribe();

        session.submit("   ").await.unwrap();
        assert!(matches!(
            next_update(&mut rx).await,
            SessionUpdate::Rejected { .. }
        ));
        assert!(session.messages().await.is_empty());
        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_replaces_partial_text() {
        let client = Arc::new(MockChatClient::new());
        client.queue_failure_after(&[&frame("Hel")], RelayError::stream("connection reset"));

        let session = start(&client, None);
        let mut rx = session.subscribe();
        session.submit("Hi").await.unwrap();

        let (_, outcome) = wait_finished(&mut rx).await;
        assert!(matches!(
            outcome,
            TurnOutcome::Failed {
                error_kind: RelayErrorKind::Stream,
                ..
            }
        ));

        let bot = session.messages().await.pop().unwrap();
        assert_eq!(bot.text, CONNECTION_FAILURE_TEXT);
        assert!(!bot.is_loading);
    }

    #[tokio::test]
    async fn test_request_failure_ends_turn() {
        let client = Arc::new(MockChatClient::new());
        client.queue_open_error(RelayError::upstream_status(502, "bad gateway"));

        let session = start(&client, None);
        let mut rx = session.subscribe();
        session.submit("Hi").await.unwrap();

        let (_, outcome) = wait_finished(&mut rx).await;
        assert!(matches!(
            outcome,
            TurnOutcome::Failed {
                error_kind: RelayErrorKind::UpstreamStatus,
                ..
            }
        ));
        let bot = session.messages().await.pop().unwrap();
        assert_eq!(bot.text, CONNECTION_FAILURE_TEXT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_stream_times_out() {
        let client = Arc::new(MockChatClient::new());
        client.queue(ScriptedReply::Silent);

        let session = start(&client, None);
        let mut rx = session.subscribe();
        session.submit("Hi").await.unwrap();

        let (_, outcome) = wait_finished(&mut rx).await;
        assert!(matches!(
            outcome,
            TurnOutcome::Failed {
                error_kind: RelayErrorKind::Timeout,
                ..
            }
        ));
        assert_eq!(
            session.messages().await.pop().unwrap().text,
            CONNECTION_FAILURE_TEXT
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_request_times_out() {
        let client = Arc::new(MockChatClient::new());
        client.queue(ScriptedReply::Unanswered);

        let session = start(&client, None);
        let mut rx = session.subscribe();
        session.submit("Hi").await.unwrap();

        let (_, outcome) = wait_finished(&mut rx).await;
        assert!(matches!(
            outcome,
            TurnOutcome::Failed {
                error_kind: RelayErrorKind::Timeout,
                ..
            }
        ));
        let bot = session.messages().await.pop().unwrap();
        assert_eq!(bot.text, CONNECTION_FAILURE_TEXT);
        assert!(!bot.is_loading);

        // The session is usable again
        client.queue_chunks(&[&frame("Back")]);
        session.submit("Retry").await.unwrap();
        let (_, outcome) = wait_finished(&mut rx).await;
        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(session.messages().await.len(), 4);
    }

    #[tokio::test]
    async fn test_dropping_session_releases_stream() {
        let client = Arc::new(MockChatClient::new());
        let tx = client.queue_channel();

        let session = start(&client, None);
        let mut rx = session.subscribe();
        session.submit("Hi").await.unwrap();
        wait_appended(&mut rx).await;

        tx.send(Ok(Bytes::from(frame("partial")))).await.unwrap();
        drop(session);

        // The reader drops its end of the channel once cancelled
        tokio::time::timeout(WAIT, tx.closed())
            .await
            .expect("stream was not released");
    }
}
