//! Command-line interface and top-level wiring.
//!
//! `run()` is the whole assembly: config, logging, credential preflight,
//! channel resolution, and then the dispatcher over the Slack event feed
//! until the feed ends, credentials go bad, or ctrl-c.

use crate::{
    config::Config,
    dispatcher::Dispatcher,
    launcher::SystemProcessHost,
    registry::ProcessRegistry,
    slack::{EventFeed, SlackMessenger},
    utils::logging::init_logging,
};
use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tracing::info;

/// Run shell commands from a chat channel with live streaming reports.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// API token; stored in the config file for later runs
    #[arg(long)]
    pub token: Option<String>,

    /// Name of the channel to watch for commands
    #[arg(long)]
    pub channel: String,

    /// Path to the token config file (default: ~/.chatexec/token.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Log to stderr instead of the rolling log file
    #[arg(long)]
    pub log_to_stderr: bool,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.debug { "debug" } else { "info" };
    init_logging(log_level, !cli.log_to_stderr)?;

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path);
    if let Some(token) = cli.token {
        config.token = token;
        config.save(&config_path)?;
    }
    if config.token.is_empty() {
        bail!(
            "no API token configured; pass --token once to store one in {}",
            config_path.display()
        );
    }

    let slack = Arc::new(SlackMessenger::new(config.token.clone()));
    slack.auth_test().await.context("credential check failed")?;

    let channel_id = slack
        .lookup_channel(&cli.channel)
        .await
        .context("channel lookup failed")?
        .ok_or_else(|| anyhow!("channel \"{}\" not found", cli.channel))?;
    info!("watching channel {} ({channel_id})", cli.channel);

    let registry = Arc::new(ProcessRegistry::new());
    let dispatcher = Dispatcher::new(
        slack.clone(),
        Arc::new(SystemProcessHost),
        registry,
        channel_id.clone(),
    );
    let feed = EventFeed::new(slack, channel_id);

    tokio::select! {
        result = dispatcher.run(feed) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
    }
}
