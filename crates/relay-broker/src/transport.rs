//! The transport trait consumed by the RPC core.
//!
//! The core needs exactly three capabilities from a broker: durable
//! declaration primitives, `publish(exchange, routing_key, bytes)`, and a
//! consumer subscription per queue. Everything above that (correlation,
//! timeouts, the error taxonomy) lives in the RPC core, so transports stay
//! mechanical.

use async_trait::async_trait;
use relay_types::RpcError;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from transport operations.
///
/// These never reach calling services directly; the RPC core converts them
/// into `RpcError` values at the boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// An exchange was redeclared with different properties.
    #[error("exchange '{name}' already declared with different properties")]
    ExchangeConflict { name: String },

    /// A queue was redeclared with different properties.
    #[error("queue '{name}' already declared with different properties")]
    QueueConflict { name: String },

    /// Publish or bind referenced an exchange that was never declared.
    #[error("exchange '{name}' not declared")]
    ExchangeNotFound { name: String },

    /// Bind or consume referenced a queue that was never declared.
    #[error("queue '{name}' not declared")]
    QueueNotFound { name: String },

    /// The queue already has a consumer attached.
    #[error("queue '{queue}' already has a consumer")]
    ConsumerAlreadyAttached { queue: String },

    /// The broker connection is gone.
    #[error("broker connection lost")]
    Disconnected,
}

impl From<TransportError> for RpcError {
    fn from(err: TransportError) -> Self {
        RpcError::Connection(err.to_string())
    }
}

/// A message handed to a queue consumer.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Routing key the message was published under.
    pub routing_key: String,
    /// Raw message bytes (an encoded envelope, for RPC traffic).
    pub payload: Vec<u8>,
}

/// Consumer handle for a single queue.
///
/// At most one consumer is attached per queue per process: the reply
/// dispatcher owns the service's reply queue, and each server adapter owns
/// its request queue.
pub struct QueueConsumer {
    queue: String,
    receiver: mpsc::Receiver<Delivery>,
}

impl QueueConsumer {
    pub fn new(queue: impl Into<String>, receiver: mpsc::Receiver<Delivery>) -> Self {
        Self {
            queue: queue.into(),
            receiver,
        }
    }

    /// Receive the next delivery, or `None` once the broker is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }

    /// Receive without waiting; `None` when no delivery is buffered.
    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.receiver.try_recv().ok()
    }

    /// The queue this consumer is attached to.
    pub fn queue(&self) -> &str {
        &self.queue
    }
}

/// Trait for broker transports.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    /// Declare a topic exchange. Idempotent for identical properties;
    /// conflicting redeclaration fails.
    async fn declare_exchange(&self, name: &str, durable: bool) -> Result<(), TransportError>;

    /// Declare a queue. Idempotent for identical properties; conflicting
    /// redeclaration fails.
    async fn declare_queue(&self, name: &str, durable: bool) -> Result<(), TransportError>;

    /// Bind a queue to an exchange under a routing key. Idempotent.
    async fn bind_queue(
        &self,
        exchange: &str,
        queue: &str,
        routing_key: &str,
    ) -> Result<(), TransportError>;

    /// Publish raw bytes to an exchange under a routing key.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> Result<(), TransportError>;

    /// Attach the consumer for a queue.
    async fn consume(&self, queue: &str) -> Result<QueueConsumer, TransportError>;
}
