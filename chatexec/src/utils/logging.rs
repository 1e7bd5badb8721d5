//! Logging initialization on the `tracing` stack.
//!
//! One-shot setup: `RUST_LOG` wins when set, otherwise the given level with
//! this crate raised to `debug`. By default logs go to a daily rolling file
//! in the user cache directory; when that is unavailable, or when stderr
//! logging is requested, output goes to stderr with ANSI colors.

use anyhow::Result;
use directories::ProjectDirs;
use std::{io::stderr, path::Path, sync::Once};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

/// Verbose stderr logging for tests; safe to call from every test.
pub fn init_test_logging() {
    let _ = init_logging("trace", false);
}

pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<()> {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},chatexec=debug")));

        if log_to_file
            && let Some(proj_dirs) = ProjectDirs::from("dev", "chatexec", "chatexec")
        {
            let log_dir = proj_dirs.cache_dir();
            if dir_is_writable(log_dir) {
                let appender = tracing_appender::rolling::daily(log_dir, "chatexec.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(non_blocking).with_ansi(false))
                    .init();
                // Leak the guard so buffered lines still flush at exit.
                Box::leak(Box::new(guard));
                return;
            }
        }

        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer().with_writer(stderr).with_ansi(true))
            .init();
    });

    Ok(())
}

/// `tracing_appender::rolling::daily` panics on permission errors; probe the
/// directory before committing to file logging.
fn dir_is_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".chatexec_log_probe");
    match std::fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
