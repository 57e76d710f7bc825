//! Terminal chat client
//!
//! Logs in against a running relay, then sends each stdin line as a chat
//! message and prints the reply as it streams in.

use chat_relay::config::ClientConfig;
use chat_relay::runtime::{ChatSession, HttpChatClient, SessionUpdate};
use chat_relay::session::Sender;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the reply text
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env()?;
    let Some(pin) = config.pin.as_deref() else {
        return Err("CHAT_PIN must be set".into());
    };

    let client = HttpChatClient::new(&config.relay_url)?;
    let user = client.login(config.email.as_deref(), pin).await?;
    tracing::info!(user_id = %user.id, relay = %config.relay_url, "Logged in");

    let greeting = format!("Hi {}! How can I help you today?", user.name);
    let session = ChatSession::start(user, client, Some(greeting), config.read_timeout);

    let mut stdout = tokio::io::stdout();
    for message in session.messages().await {
        stdout.write_all(format!("{}\n", message.text).as_bytes()).await?;
    }
    stdout.flush().await?;

    let mut updates = BroadcastStream::new(session.subscribe());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        session.submit(line).await?;

        let mut shown = String::new();
        while let Some(update) = updates.next().await {
            match update {
                Ok(SessionUpdate::Updated { message }) if message.sender == Sender::Bot => {
                    // Streamed text only grows; anything else is the failure text
                    let out = match message.text.strip_prefix(shown.as_str()) {
                        Some(delta) => delta.to_string(),
                        None => format!("\n{}", message.text),
                    };
                    stdout.write_all(out.as_bytes()).await?;
                    stdout.flush().await?;
                    shown = message.text;
                }
                Ok(SessionUpdate::TurnFinished { .. }) => {
                    stdout.write_all(b"\n").await?;
                    stdout.flush().await?;
                    break;
                }
                Ok(SessionUpdate::Rejected { reason }) => {
                    tracing::warn!(reason = %reason, "Message not sent");
                    break;
                }
                Ok(_) => {}
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed session updates");
                }
            }
        }
    }

    session.shutdown();
    Ok(())
}
