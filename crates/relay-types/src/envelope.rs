//! # Message Envelope
//!
//! The universal wrapper for every message published to the broker, in both
//! directions.
//!
//! ## Wire Properties
//!
//! - **Text/JSON**: envelopes are UTF-8 JSON with camelCase header fields,
//!   so services deployed out of lock-step (or on other stacks) can read
//!   them.
//! - **Correlation**: request/reply flows use `correlationId`, `replyTo`,
//!   and `replyExchange`.
//! - **Forward Compatibility**: decoding ignores unknown fields. A newer
//!   service adding payload fields must not break an older consumer.

use crate::correlation::CorrelationId;
use crate::errors::RpcError;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Outcome marker set on reply envelopes.
///
/// Requests leave it unset (`null` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageStatus {
    Success,
    Error,
}

/// Routing and correlation metadata carried by every envelope.
///
/// For requests, `reply_to`/`reply_exchange` point at the *caller's* own
/// reply queue and exchange. Responders publish the reply there verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Unique identifier correlating a request with its reply.
    /// For requests: freshly generated. For replies: copied from the request.
    pub correlation_id: CorrelationId,

    /// Queue the reply should be published to (routing key on the reply
    /// exchange). Empty for one-way messages and for replies themselves.
    #[serde(default)]
    pub reply_to: String,

    /// Exchange the reply should be published to.
    #[serde(default)]
    pub reply_exchange: String,

    /// Logical name of the sending service.
    pub source_service: String,

    /// Logical name of the intended recipient service.
    pub target_service: String,

    /// Set on replies only: whether the handler succeeded.
    #[serde(default)]
    pub status: Option<MessageStatus>,

    /// Milliseconds since the Unix epoch at send time.
    pub timestamp: i64,
}

impl Header {
    /// Build a request header addressed from `source` to `target`, with the
    /// reply routed back to `(reply_exchange, reply_to)`.
    pub fn request(
        source: impl Into<String>,
        target: impl Into<String>,
        reply_exchange: impl Into<String>,
        reply_to: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            reply_to: reply_to.into(),
            reply_exchange: reply_exchange.into(),
            source_service: source.into(),
            target_service: target.into(),
            status: None,
            timestamp: epoch_millis(),
        }
    }

    /// Build a one-way header with no reply routing. Receivers handle the
    /// message but send nothing back.
    pub fn one_way(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            reply_to: String::new(),
            reply_exchange: String::new(),
            source_service: source.into(),
            target_service: target.into(),
            status: None,
            timestamp: epoch_millis(),
        }
    }

    /// Whether this header carries reply routing.
    pub fn expects_reply(&self) -> bool {
        !self.reply_to.is_empty() && !self.reply_exchange.is_empty()
    }

    /// Build the reply header for a received request, preserving the
    /// correlation ID and swapping source/target.
    pub fn reply_to(request: &Header, source: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            correlation_id: request.correlation_id,
            reply_to: String::new(),
            reply_exchange: String::new(),
            source_service: source.into(),
            target_service: request.source_service.clone(),
            status: Some(status),
            timestamp: epoch_millis(),
        }
    }
}

/// Unit of wire transmission: routing/correlation metadata plus the
/// call-specific JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub header: Header,
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn new(header: Header, payload: serde_json::Value) -> Self {
        Self { header, payload }
    }

    /// Encode to the UTF-8 JSON wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RpcError> {
        serde_json::to_vec(self).map_err(|e| RpcError::Serialization(e.to_string()))
    }

    /// Decode from the wire form.
    ///
    /// Unknown fields are ignored; any failure is classified as a
    /// serialization error so consuming loops can log and continue.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RpcError> {
        serde_json::from_slice(bytes).map_err(|e| RpcError::Serialization(e.to_string()))
    }
}

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
