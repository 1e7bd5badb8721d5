//! Shared limits for the report format.

/// Maximum formatted length of a single report message, in characters.
/// The chat platform rejects longer bodies:
/// <https://api.slack.com/docs/message-formatting>
pub const MAX_MESSAGE_LEN: usize = 4000;
