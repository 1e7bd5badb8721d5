//! The streaming reporter: one task per accepted command.
//!
//! Drives the launcher, folds `[pid] line` output through the chunker, and
//! mirrors each block into a chat message. Every report id created during an
//! execution stays registered until the process is gone, so a cancellation
//! reply targeting any historical chunk still kills the group. Chat sends
//! and updates are best-effort; a failure never stops the read loop, which
//! must keep draining so the child is not starved on a full pipe.

use crate::{
    chunker::{Append, Chunker},
    constants::MAX_MESSAGE_LEN,
    launcher::{ProcessGroup, ProcessHost},
    messenger::{ChannelId, MessageId, Messenger},
    registry::ProcessRegistry,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Unregisters every report id of one execution when dropped. Drop-based so
/// the purge runs on every exit path: normal completion, start failure, or
/// an early return mid-loop.
struct RegistryGuard {
    registry: Arc<ProcessRegistry>,
    ids: Vec<MessageId>,
}

impl RegistryGuard {
    fn new(registry: Arc<ProcessRegistry>) -> Self {
        Self {
            registry,
            ids: Vec::new(),
        }
    }

    /// Register `id` and remember it for the final purge.
    fn register(&mut self, id: MessageId, group: ProcessGroup) {
        self.registry.register(id.clone(), group);
        self.ids.push(id);
    }
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        for id in &self.ids {
            self.registry.unregister(id);
        }
    }
}

/// Execute `text` and stream its output into `channel`.
///
/// Runs to completion as its own task; every failure is contained here and
/// never reaches the dispatcher or other executions.
pub async fn run_command(
    text: String,
    channel: ChannelId,
    host: Arc<dyn ProcessHost>,
    messenger: Arc<dyn Messenger>,
    registry: Arc<ProcessRegistry>,
) {
    let mut running = match host.spawn_group(&text).await {
        Ok(running) => running,
        Err(e) => {
            error!("failed to start \"{text}\": {e}");
            return;
        }
    };
    let pid = running.pid();
    let group = running.group();
    debug!("started \"{text}\" as pid {pid}");

    let mut guard = RegistryGuard::new(registry);
    let mut chunker = Chunker::new(MAX_MESSAGE_LEN);

    let hostname = gethostname::gethostname().to_string_lossy().into_owned();
    let header = match chunker.push(format!("execute \"{text}\" on {hostname}")) {
        Append::Updated(content) => content,
        // The header is the first line of the first block; it cannot roll.
        Append::Rolled { fresh, .. } => fresh,
    };

    let mut current = post_block(messenger.as_ref(), &channel, &header).await;
    if let Some(id) = &current {
        guard.register(id.clone(), group);
    }

    while let Some(line) = running.next_line().await {
        match chunker.push(format!("[{pid}] {line}")) {
            Append::Updated(content) => {
                update_block(messenger.as_ref(), &channel, current.as_deref(), &content).await;
            }
            Append::Rolled { sealed, fresh } => {
                update_block(messenger.as_ref(), &channel, current.as_deref(), &sealed).await;
                current = post_block(messenger.as_ref(), &channel, &fresh).await;
                if let Some(id) = &current {
                    guard.register(id.clone(), group);
                }
            }
        }
    }

    let termination = match running.wait().await {
        Ok(status) => format!("terminated with {status}"),
        Err(e) => format!("terminated with unknown status ({e})"),
    };
    debug!("pid {pid}: {termination}");

    match chunker.push(termination) {
        Append::Updated(content) => {
            update_block(messenger.as_ref(), &channel, current.as_deref(), &content).await;
        }
        Append::Rolled { sealed, fresh } => {
            update_block(messenger.as_ref(), &channel, current.as_deref(), &sealed).await;
            // The process is gone; the trailing block needs no registry entry.
            post_block(messenger.as_ref(), &channel, &fresh).await;
        }
    }
}

/// Post a new report message. A failed send is logged and yields no id, so
/// later in-place updates for this block are skipped while output drains.
async fn post_block(messenger: &dyn Messenger, channel: &str, content: &str) -> Option<MessageId> {
    match messenger.post_message(channel, content).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("posting report to {channel} failed: {e}");
            None
        }
    }
}

/// Best-effort in-place update of the current report message.
async fn update_block(messenger: &dyn Messenger, channel: &str, id: Option<&str>, content: &str) {
    let Some(id) = id else { return };
    if let Err(e) = messenger.update_message(channel, id, content).await {
        warn!("updating report {id} failed: {e}");
    }
}
