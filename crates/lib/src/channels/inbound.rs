//! Inbound events from the LINE platform, decoded from a webhook body.
//!
//! The serialized form keeps LINE's wire shape (`type` tag, camelCase fields) so an event
//! can be republished to the bus as-is.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One occurrence delivered by the chat platform (message, follow, join, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    /// Token for replying to this event; absent for events that cannot be replied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<EventSource>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: i64,
    /// "active" or "standby".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_context: Option<DeliveryContext>,
}

/// Event kind, tagged by the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    Message { message: MessageContent },
    Follow,
    Unfollow,
    Join,
    Leave,
    Postback { postback: Postback },
    /// Any event type this crate does not model.
    #[serde(other)]
    Other,
}

/// Message body of a `message` event, tagged by its own `type` field.
///
/// Fields not modelled here are kept in `extra` so a republished event carries
/// everything LINE sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MessageContent {
    Text {
        id: String,
        text: String,
        /// Token for quoting this message in a reply.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quote_token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mention: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        emojis: Option<Value>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Image {
        id: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Video {
        id: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Audio {
        id: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    File {
        id: String,
        file_name: String,
        #[serde(default)]
        file_size: u64,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Location {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        latitude: f64,
        longitude: f64,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Sticker {
        id: String,
        package_id: String,
        sticker_id: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    #[serde(other)]
    Other,
}

impl MessageContent {
    /// Plain text message with no mention, emoji, or quote data.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            id: id.into(),
            text: text.into(),
            quote_token: None,
            mention: None,
            emojis: None,
            extra: Map::new(),
        }
    }
}

/// Who the event came from: a user, a group, or a multi-person room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Postback {
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    pub is_redelivery: bool,
}

impl InboundEvent {
    /// Build a text message event from a user (used by the CLI and tests).
    pub fn text_message(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Message {
                message: MessageContent::text(id, text),
            },
            reply_token: None,
            source: None,
            timestamp: 0,
            mode: None,
            webhook_event_id: None,
            delivery_context: None,
        }
    }

    /// Wire name of the event kind, for logging.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EventKind::Message { .. } => "message",
            EventKind::Follow => "follow",
            EventKind::Unfollow => "unfollow",
            EventKind::Join => "join",
            EventKind::Leave => "leave",
            EventKind::Postback { .. } => "postback",
            EventKind::Other => "other",
        }
    }
}
