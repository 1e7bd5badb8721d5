//! Shared helpers for integration tests: an in-memory recording messenger
//! and a scripted event source.

use crate::messenger::{ChatEvent, EventSource, MessageId, Messenger, MessengerError};
use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

/// One chat message as the recording messenger saw it: its id and every
/// content revision in order (index 0 is the original post).
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub id: MessageId,
    pub channel: String,
    pub revisions: Vec<String>,
}

impl SentMessage {
    /// The content the message displays now.
    pub fn final_content(&self) -> &str {
        self.revisions.last().map(String::as_str).unwrap_or_default()
    }
}

/// In-memory [`Messenger`] that records every post and update. Ids look
/// like platform timestamps. Sends can be forced to fail to exercise the
/// best-effort paths.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    messages: Mutex<Vec<SentMessage>>,
    counter: AtomicU64,
    fail_all: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent post and update fail.
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SentMessage>> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of all messages, in posting order.
    pub fn messages(&self) -> Vec<SentMessage> {
        self.lock().clone()
    }

    pub fn message(&self, id: &str) -> Option<SentMessage> {
        self.lock().iter().find(|m| m.id == id).cloned()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn post_message(
        &self,
        channel: &str,
        content: &str,
    ) -> Result<MessageId, MessengerError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(MessengerError::Api("synthetic send failure".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let id = format!("1700000000.{n:06}");
        self.lock().push(SentMessage {
            id: id.clone(),
            channel: channel.to_string(),
            revisions: vec![content.to_string()],
        });
        Ok(id)
    }

    async fn update_message(
        &self,
        _channel: &str,
        id: &str,
        content: &str,
    ) -> Result<(), MessengerError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(MessengerError::Api("synthetic send failure".to_string()));
        }
        match self.lock().iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.revisions.push(content.to_string());
                Ok(())
            }
            None => Err(MessengerError::Api("message_not_found".to_string())),
        }
    }
}

/// Event source that yields a fixed script, then ends.
#[derive(Debug)]
pub struct ScriptedEvents {
    events: VecDeque<ChatEvent>,
}

impl ScriptedEvents {
    pub fn new(events: impl IntoIterator<Item = ChatEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

#[async_trait]
impl EventSource for ScriptedEvents {
    async fn next_event(&mut self) -> Option<ChatEvent> {
        self.events.pop_front()
    }
}

/// Split a fenced report body back into its lines.
pub fn fenced_lines(content: &str) -> Vec<String> {
    content
        .strip_prefix("```\n")
        .and_then(|c| c.strip_suffix("\n```"))
        .map(|c| c.split('\n').map(str::to_string).collect())
        .unwrap_or_default()
}
