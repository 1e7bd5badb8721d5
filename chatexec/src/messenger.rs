//! Interfaces to the chat platform.
//!
//! The engine depends only on these traits; a backend implements them. All
//! sends and updates are best-effort from the engine's point of view: errors
//! are surfaced to the caller but never retried.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Chat channel identifier, assigned by the platform.
pub type ChannelId = String;

/// Chat message identifier, assigned by the platform at post time and
/// unknown until the first send succeeds. Doubles as the report identifier
/// for cancellation lookups.
pub type MessageId = String;

#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat API rejected the call: {0}")]
    Api(String),
    #[error("invalid credentials")]
    InvalidAuth,
    #[error("malformed chat API response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outbound message operations the engine needs.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Create a new message and return its platform-assigned id.
    async fn post_message(&self, channel: &str, content: &str)
    -> Result<MessageId, MessengerError>;

    /// Replace the content of an existing message.
    async fn update_message(
        &self,
        channel: &str,
        id: &str,
        content: &str,
    ) -> Result<(), MessengerError>;
}

/// One inbound chat event, already normalized by the backend (markup
/// unescaped, identifiers extracted).
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A new message in some channel.
    Message {
        channel: ChannelId,
        text: String,
        /// Sender-side timestamp, seconds since the Unix epoch.
        sender_ts: f64,
        /// Platform message subtype; anything but a plain message is ignored
        /// by the dispatcher.
        subtype: Option<String>,
    },
    /// A reply to an existing message, carrying the replied-to id.
    Replied { target: MessageId },
    /// The platform rejected our credentials; terminal for dispatching.
    InvalidAuth,
}

/// Source of inbound events; `None` ends dispatching.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Option<ChatEvent>;
}

#[async_trait]
impl EventSource for mpsc::Receiver<ChatEvent> {
    async fn next_event(&mut self) -> Option<ChatEvent> {
        self.recv().await
    }
}
