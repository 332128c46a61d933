//! Command extraction: a text message that starts with the bot prefix carries one command.

use crate::channels::{EventKind, InboundEvent, MessageContent};
use std::fmt;

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "tmb";

/// Trimmed text following the prefix. May be empty (e.g. "tmb   ").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command(String);

impl Command {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the command from a text message starting with `prefix`.
///
/// The prefix match is literal and case-sensitive with no leading whitespace allowed, so
/// `"tmbping"` also yields `"ping"`. Every other event kind yields `None`.
pub fn extract_command(event: &InboundEvent, prefix: &str) -> Option<Command> {
    let text = match &event.kind {
        EventKind::Message { message } => match message {
            MessageContent::Text { text, .. } => text,
            MessageContent::Image { .. }
            | MessageContent::Video { .. }
            | MessageContent::Audio { .. }
            | MessageContent::File { .. }
            | MessageContent::Location { .. }
            | MessageContent::Sticker { .. }
            | MessageContent::Other => return None,
        },
        EventKind::Follow
        | EventKind::Unfollow
        | EventKind::Join
        | EventKind::Leave
        | EventKind::Postback { .. }
        | EventKind::Other => return None,
    };
    text.strip_prefix(prefix).map(|rest| Command::new(rest.trim()))
}
