//! LINE webhook decoding: verify `X-Line-Signature` and parse the event list.
//!
//! The signature is the base64 HMAC-SHA256 of the raw request body keyed with the channel
//! secret. Any failure here rejects the whole request before a single event is dispatched.

use crate::channels::inbound::InboundEvent;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "X-Line-Signature";

/// Why a webhook request was rejected.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("missing {} header", SIGNATURE_HEADER)]
    MissingSignature,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed webhook body: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(default)]
    destination: Option<String>,
    #[serde(default)]
    events: Vec<InboundEvent>,
}

/// Authenticates and decodes LINE webhook requests for one channel.
#[derive(Clone)]
pub struct LineWebhook {
    channel_secret: String,
}

impl std::fmt::Debug for LineWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineWebhook")
            .field("channel_secret", &"[REDACTED]")
            .finish()
    }
}

impl LineWebhook {
    pub fn new(channel_secret: impl Into<String>) -> Self {
        Self {
            channel_secret: channel_secret.into(),
        }
    }

    fn mac(&self) -> Hmac<Sha256> {
        // HMAC accepts keys of any length, so this cannot fail.
        Hmac::<Sha256>::new_from_slice(self.channel_secret.as_bytes())
            .unwrap_or_else(|_| unreachable!("hmac accepts any key length"))
    }

    /// True when `signature` is the base64 HMAC-SHA256 of `body`. Comparison is constant-time.
    pub fn verify_signature(&self, body: &[u8], signature: &str) -> bool {
        let Ok(sig_bytes) = base64::engine::general_purpose::STANDARD.decode(signature.trim())
        else {
            log::debug!("line webhook: signature is not valid base64");
            return false;
        };
        let mut mac = self.mac();
        mac.update(body);
        mac.verify_slice(&sig_bytes).is_ok()
    }

    /// Compute the signature LINE would send for `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(body);
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Verify the request and return its events in delivery order.
    pub fn decode(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<Vec<InboundEvent>, DecodeError> {
        let signature = signature.ok_or(DecodeError::MissingSignature)?;
        if !self.verify_signature(body, signature) {
            return Err(DecodeError::InvalidSignature);
        }
        let parsed: WebhookBody = serde_json::from_slice(body)?;
        log::debug!(
            "line webhook: {} event(s) for destination {}",
            parsed.events.len(),
            parsed.destination.as_deref().unwrap_or("-")
        );
        Ok(parsed.events)
    }
}
