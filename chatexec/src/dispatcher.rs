//! Sequential inbound event loop.
//!
//! Routes plain channel messages into new reporter tasks and reply events
//! into process-group kills. The loop never blocks on an execution:
//! reporters run as detached tasks with their own lifetime, and cancellation
//! is only a registry lookup plus a signal send; it never waits for the
//! target process to exit.

use crate::{
    launcher::ProcessHost,
    messenger::{ChannelId, ChatEvent, EventSource, Messenger},
    registry::ProcessRegistry,
    reporter,
};
use anyhow::{Result, bail};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, error, info};

pub struct Dispatcher {
    messenger: Arc<dyn Messenger>,
    host: Arc<dyn ProcessHost>,
    registry: Arc<ProcessRegistry>,
    channel: ChannelId,
    /// Events timestamped before this instant are replays of history
    /// (reconnects redeliver old messages) and are never executed.
    started_at: f64,
}

impl Dispatcher {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        host: Arc<dyn ProcessHost>,
        registry: Arc<ProcessRegistry>,
        channel: ChannelId,
    ) -> Self {
        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Self {
            messenger,
            host,
            registry,
            channel,
            started_at,
        }
    }

    /// Drain `events` until the source ends or the platform reports invalid
    /// credentials, the only process-wide fatal condition.
    pub async fn run(&self, mut events: impl EventSource) -> Result<()> {
        while let Some(event) = events.next_event().await {
            if !self.handle_event(event) {
                bail!("chat backend reported invalid credentials");
            }
        }
        Ok(())
    }

    /// Process one event. Returns `false` when dispatching must stop.
    pub fn handle_event(&self, event: ChatEvent) -> bool {
        match event {
            ChatEvent::Message {
                channel,
                text,
                sender_ts,
                subtype,
            } => {
                if self.accepts(&channel, &text, sender_ts, subtype.as_deref()) {
                    info!("executing \"{text}\" from {channel}");
                    tokio::spawn(reporter::run_command(
                        text,
                        channel,
                        self.host.clone(),
                        self.messenger.clone(),
                        self.registry.clone(),
                    ));
                }
            }
            ChatEvent::Replied { target } => self.cancel(&target),
            ChatEvent::InvalidAuth => {
                error!("invalid credentials; dispatching stops");
                return false;
            }
        }
        true
    }

    /// A message qualifies as a command only if it is a plain message in the
    /// watched channel, newer than process start, and not the literal `quit`.
    fn accepts(&self, channel: &str, text: &str, sender_ts: f64, subtype: Option<&str>) -> bool {
        subtype.is_none_or(str::is_empty)
            && sender_ts > self.started_at
            && channel == self.channel
            && text != "quit"
    }

    /// Kill the process group behind a replied-to report, if it is still
    /// registered. Stale or unknown targets are ignored; a finished
    /// execution has already purged its ids and simply misses here.
    pub fn cancel(&self, target: &str) {
        let Some(group) = self.registry.lookup(target) else {
            debug!("ignoring reply to unknown or finished report {target}");
            return;
        };
        info!("cancelling process group {} for report {target}", group.0);
        if let Err(e) = self.host.kill_group(group) {
            debug!("kill of group {} failed: {e}", group.0);
        }
    }
}
