//! Chat platform channels.
//!
//! Only LINE is supported: webhook requests are authenticated and decoded into
//! [`InboundEvent`]s, which the dispatcher routes to bus topics.

mod inbound;
mod line;

pub use inbound::{DeliveryContext, EventKind, EventSource, InboundEvent, MessageContent, Postback};
pub use line::{DecodeError, LineWebhook, SIGNATURE_HEADER};
