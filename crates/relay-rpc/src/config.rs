//! Runtime configuration for an RPC node.

use std::time::Duration;

/// Default deadline for a call when the caller does not supply one.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between expired-call sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Who this process is on the wire, and where its replies come home to.
///
/// The reply queue is bound on the reply exchange under its own name as the
/// routing key, so responders can publish replies with nothing but the two
/// header fields the request carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    /// Logical service name stamped into envelope headers.
    pub service_name: String,
    /// Exchange replies to this service are published on.
    pub reply_exchange: String,
    /// Queue (and routing key) replies to this service arrive on.
    pub reply_queue: String,
}

impl ServiceIdentity {
    pub fn new(
        service_name: impl Into<String>,
        reply_exchange: impl Into<String>,
        reply_queue: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            reply_exchange: reply_exchange.into(),
            reply_queue: reply_queue.into(),
        }
    }

    /// Identity following the platform naming convention for a domain:
    /// exchange `<domain>.exchange`, reply queue `<domain>.reply.queue`.
    pub fn for_domain(service_name: impl Into<String>, domain: &str) -> Self {
        Self {
            service_name: service_name.into(),
            reply_exchange: format!("{domain}.exchange"),
            reply_queue: format!("{domain}.reply.queue"),
        }
    }
}

/// Tunables for the RPC core.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Deadline applied to calls that do not specify their own.
    pub default_timeout: Duration,
    /// How often the background sweeper evicts expired pending calls.
    pub sweep_interval: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_CALL_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}
