//! Slack Web API backend.
//!
//! Implements [`Messenger`] over `chat.postMessage`/`chat.update` and
//! supplies an [`EventFeed`] that polls `conversations.history`, mapping
//! thread replies onto [`ChatEvent::Replied`]. Message timestamps (`ts`)
//! serve as message ids, as the API defines them.

use crate::messenger::{ChatEvent, EventSource, MessageId, Messenger, MessengerError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::warn;

const DEFAULT_API_BASE: &str = "https://slack.com/api";
const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct SlackMessenger {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

/// Superset envelope for the handful of API calls we make; Slack always
/// returns `ok` plus call-specific fields.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    messages: Option<Vec<HistoryMessage>>,
    #[serde(default)]
    channels: Option<Vec<ChannelInfo>>,
}

#[derive(Debug, Deserialize)]
struct HistoryMessage {
    ts: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelInfo {
    id: String,
    name: String,
}

impl SlackMessenger {
    pub fn new(token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API root (tests, proxies).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn call(&self, method: &str, payload: Value) -> Result<ApiEnvelope, MessengerError> {
        let response = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        let envelope: ApiEnvelope = response.json().await?;
        if envelope.ok {
            return Ok(envelope);
        }
        match envelope.error.as_deref() {
            Some("invalid_auth" | "not_authed" | "token_revoked" | "account_inactive") => {
                Err(MessengerError::InvalidAuth)
            }
            other => Err(MessengerError::Api(other.unwrap_or("unknown").to_string())),
        }
    }

    /// `auth.test` preflight; distinguishes bad credentials from transport
    /// trouble before dispatching starts.
    pub async fn auth_test(&self) -> Result<(), MessengerError> {
        self.call("auth.test", json!({})).await.map(|_| ())
    }

    /// Resolve a channel name to its id via `conversations.list`.
    pub async fn lookup_channel(&self, name: &str) -> Result<Option<String>, MessengerError> {
        let envelope = self
            .call(
                "conversations.list",
                json!({"limit": 1000, "exclude_archived": true}),
            )
            .await?;
        Ok(envelope
            .channels
            .unwrap_or_default()
            .into_iter()
            .find(|channel| channel.name == name)
            .map(|channel| channel.id))
    }

    async fn history(
        &self,
        channel: &str,
        oldest: &str,
    ) -> Result<Vec<HistoryMessage>, MessengerError> {
        let envelope = self
            .call(
                "conversations.history",
                json!({"channel": channel, "oldest": oldest, "limit": 200}),
            )
            .await?;
        let mut messages = envelope.messages.unwrap_or_default();
        // The API returns newest first; events go out in arrival order.
        messages.reverse();
        Ok(messages)
    }
}

#[async_trait]
impl Messenger for SlackMessenger {
    async fn post_message(
        &self,
        channel: &str,
        content: &str,
    ) -> Result<MessageId, MessengerError> {
        let envelope = self
            .call(
                "chat.postMessage",
                json!({"channel": channel, "text": content}),
            )
            .await?;
        envelope
            .ts
            .ok_or_else(|| MessengerError::Api("chat.postMessage returned no ts".to_string()))
    }

    async fn update_message(
        &self,
        channel: &str,
        id: &str,
        content: &str,
    ) -> Result<(), MessengerError> {
        self.call(
            "chat.update",
            json!({"channel": channel, "ts": id, "text": content}),
        )
        .await
        .map(|_| ())
    }
}

/// Undo the entity escaping Slack applies to message text. Only `&`, `<`
/// and `>` are escaped on this platform; `&amp;` goes last so already-plain
/// sequences are not unescaped twice.
pub fn unescape_markup(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn now_epoch_ts() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    format!("{seconds:.6}")
}

fn normalize(channel: &str, message: HistoryMessage) -> ChatEvent {
    if let Some(parent) = message.thread_ts.as_ref().filter(|t| **t != message.ts) {
        return ChatEvent::Replied {
            target: parent.clone(),
        };
    }
    ChatEvent::Message {
        channel: channel.to_string(),
        text: unescape_markup(&message.text),
        sender_ts: message.ts.parse().unwrap_or_default(),
        subtype: message.subtype,
    }
}

/// Polls one channel's history and yields normalized [`ChatEvent`]s.
///
/// Thread replies surface as [`ChatEvent::Replied`] carrying the parent
/// message id. Transport errors are logged and polling continues; an auth
/// rejection yields one [`ChatEvent::InvalidAuth`] and ends the feed.
pub struct EventFeed {
    slack: Arc<SlackMessenger>,
    channel: String,
    /// Newest `ts` seen; `oldest` in the history call is exclusive, so only
    /// strictly newer messages come back.
    cursor: String,
    pending: VecDeque<ChatEvent>,
    done: bool,
}

impl EventFeed {
    pub fn new(slack: Arc<SlackMessenger>, channel: String) -> Self {
        Self {
            slack,
            channel,
            cursor: now_epoch_ts(),
            pending: VecDeque::new(),
            done: false,
        }
    }
}

#[async_trait]
impl EventSource for EventFeed {
    async fn next_event(&mut self) -> Option<ChatEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.done {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            match self.slack.history(&self.channel, &self.cursor).await {
                Ok(messages) => {
                    for message in messages {
                        self.cursor = message.ts.clone();
                        self.pending.push_back(normalize(&self.channel, message));
                    }
                }
                Err(MessengerError::InvalidAuth) => {
                    self.done = true;
                    return Some(ChatEvent::InvalidAuth);
                }
                Err(e) => warn!("history poll failed: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_markup() {
        assert_eq!(unescape_markup("ls &amp;&amp; pwd"), "ls && pwd");
        assert_eq!(unescape_markup("cat &lt;&lt;EOF &gt;out"), "cat <<EOF >out");
        // a literal "&amp;lt;" decodes once, not twice
        assert_eq!(unescape_markup("&amp;lt;"), "&lt;");
        assert_eq!(unescape_markup("plain"), "plain");
    }

    #[test]
    fn test_envelope_parses_post_message_response() {
        let raw = r#"{"ok":true,"channel":"C123","ts":"1700000001.000200"}"#;
        let envelope: ApiEnvelope = serde_json::from_str(raw).expect("parse");
        assert!(envelope.ok);
        assert_eq!(envelope.ts.as_deref(), Some("1700000001.000200"));
    }

    #[test]
    fn test_envelope_parses_error_response() {
        let raw = r#"{"ok":false,"error":"invalid_auth"}"#;
        let envelope: ApiEnvelope = serde_json::from_str(raw).expect("parse");
        assert!(!envelope.ok);
        assert_eq!(envelope.error.as_deref(), Some("invalid_auth"));
    }

    #[test]
    fn test_normalize_thread_reply_to_cancellation_event() {
        let message = HistoryMessage {
            ts: "1700000002.000100".to_string(),
            text: "kill it".to_string(),
            subtype: None,
            thread_ts: Some("1700000001.000200".to_string()),
        };
        assert_eq!(
            normalize("C123", message),
            ChatEvent::Replied {
                target: "1700000001.000200".to_string()
            }
        );
    }

    #[test]
    fn test_normalize_plain_message() {
        let message = HistoryMessage {
            ts: "1700000002.000100".to_string(),
            text: "echo &amp;".to_string(),
            subtype: None,
            thread_ts: None,
        };
        match normalize("C123", message) {
            ChatEvent::Message {
                channel,
                text,
                sender_ts,
                subtype,
            } => {
                assert_eq!(channel, "C123");
                assert_eq!(text, "echo &");
                assert!((sender_ts - 1_700_000_002.0001).abs() < 1e-6);
                assert_eq!(subtype, None);
            }
            other => panic!("expected plain message, got {other:?}"),
        }
    }

    #[test]
    fn test_thread_parent_is_not_a_reply() {
        // Slack sets thread_ts == ts on the parent message itself.
        let message = HistoryMessage {
            ts: "1700000001.000200".to_string(),
            text: "echo hi".to_string(),
            subtype: None,
            thread_ts: Some("1700000001.000200".to_string()),
        };
        assert!(matches!(
            normalize("C123", message),
            ChatEvent::Message { .. }
        ));
    }
}
