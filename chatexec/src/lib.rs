//! # chatexec
//!
//! Run shell commands from a chat channel and stream their output back as
//! live-updating, size-bounded report messages. Replying to a report kills
//! the whole process group behind it.
//!
//! ## Core components
//!
//! - [`registry`]: shared map from report message id to process group,
//!   enabling cancellation by reply.
//! - [`chunker`]: pure pagination of output lines into bounded fenced blocks.
//! - [`launcher`]: process-group spawning and killing behind the
//!   [`launcher::ProcessHost`] capability trait.
//! - [`reporter`]: the per-command streaming loop that posts and updates
//!   report messages as output arrives.
//! - [`dispatcher`]: the sequential inbound event loop routing new commands
//!   and reply-cancellations.
//!
//! The chat backend is abstracted by [`messenger::Messenger`] and
//! [`messenger::EventSource`]; [`slack`] provides the Slack Web API
//! implementation used by the binary.

pub mod chunker;
pub mod cli;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod launcher;
pub mod messenger;
pub mod registry;
pub mod reporter;
pub mod slack;
pub mod test_utils;
pub mod utils;
