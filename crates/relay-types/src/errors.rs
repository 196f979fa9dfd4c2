//! RPC error taxonomy.
//!
//! Every failure a caller can observe from `call()` is one of these fixed
//! kinds. Classification is programmatic (`kind()`), not string matching, so
//! callers can decide retry policy: timeouts and connection failures are
//! retry candidates, everything else is terminal.

use thiserror::Error;

/// Typed failure surfaced by the RPC core.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No correlated reply arrived before the caller's deadline.
    #[error("call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The transport could not accept or deliver the message.
    #[error("transport unreachable: {0}")]
    Connection(String),

    /// An envelope or payload could not be encoded or decoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The remote handler replied with a non-success code. The numeric code
    /// is retained so callers can remap it into their own error scheme.
    #[error("remote handler returned {code}: {message}")]
    Response { code: i32, message: String },

    /// Anything that does not fit the other kinds.
    #[error("unexpected failure: {0}")]
    Unknown(String),
}

impl RpcError {
    /// Programmatic classification of this error.
    pub fn kind(&self) -> RpcErrorKind {
        match self {
            Self::Timeout { .. } => RpcErrorKind::Timeout,
            Self::Connection(_) => RpcErrorKind::Connection,
            Self::Serialization(_) => RpcErrorKind::Serialization,
            Self::Response { .. } => RpcErrorKind::Response,
            Self::Unknown(_) => RpcErrorKind::Unknown,
        }
    }

    /// The remote handler's code, when this is a `Response` error.
    pub fn remote_code(&self) -> Option<i32> {
        match self {
            Self::Response { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether a caller may reasonably retry the call.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// The fixed classification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorKind {
    Timeout,
    Connection,
    Serialization,
    Response,
    Unknown,
}

impl RpcErrorKind {
    /// Whether a caller may reasonably retry the call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection)
    }
}
