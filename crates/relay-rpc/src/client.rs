//! The calling side: synchronous request/response over the broker.

use crate::config::{RpcConfig, ServiceIdentity};
use crate::pending::PendingCallStore;
use relay_broker::BrokerTransport;
use relay_types::{Envelope, Header, Response, RpcError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Issues calls and one-way notifications on behalf of one service.
///
/// `call` blocks the calling task (never the thread) until the matching
/// reply arrives or the deadline elapses. Any number of calls may be in
/// flight concurrently; correlation IDs keep them independent.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn BrokerTransport>,
    identity: ServiceIdentity,
    pending: Arc<PendingCallStore>,
    config: RpcConfig,
}

impl RpcClient {
    pub(crate) fn new(
        transport: Arc<dyn BrokerTransport>,
        identity: ServiceIdentity,
        pending: Arc<PendingCallStore>,
        config: RpcConfig,
    ) -> Self {
        Self {
            transport,
            identity,
            pending,
            config,
        }
    }

    /// Call a remote operation and wait for its reply.
    ///
    /// The request is published to `exchange` under `routing_key`; the reply
    /// comes back on this service's own reply queue. On success the decoded
    /// business response is returned with `data` typed as `T`. A business
    /// failure (non-2xx code) surfaces as [`RpcError::Response`] carrying
    /// the remote code and message.
    #[instrument(skip(self, payload), fields(source = %self.identity.service_name))]
    pub async fn call<T, P>(
        &self,
        exchange: &str,
        routing_key: &str,
        target_service: &str,
        payload: &P,
        timeout: Option<Duration>,
    ) -> Result<Response<T>, RpcError>
    where
        T: DeserializeOwned,
        P: Serialize + Sync + ?Sized,
    {
        let payload =
            serde_json::to_value(payload).map_err(|e| RpcError::Serialization(e.to_string()))?;
        let timeout = timeout.unwrap_or(self.config.default_timeout);

        let (correlation_id, receiver) = self.pending.register(routing_key, Some(timeout));
        let mut header = Header::request(
            &self.identity.service_name,
            target_service,
            &self.identity.reply_exchange,
            &self.identity.reply_queue,
        );
        header.correlation_id = correlation_id;

        let bytes = match Envelope::new(header, payload).to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.pending.cancel(&correlation_id);
                return Err(e);
            }
        };
        if let Err(e) = self.transport.publish(exchange, routing_key, bytes).await {
            self.pending.cancel(&correlation_id);
            return Err(e.into());
        }
        debug!(
            correlation_id = %correlation_id,
            exchange, routing_key, timeout_ms = timeout.as_millis() as u64,
            "Published request"
        );

        let reply = match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                // The sender was dropped without a reply: the sweeper
                // evicted the call at its deadline.
                return Err(RpcError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Err(_) => {
                self.pending.expire(&correlation_id);
                return Err(RpcError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        };

        let response: Response<serde_json::Value> = serde_json::from_value(reply.payload)
            .map_err(|e| RpcError::Serialization(e.to_string()))?;
        if !response.is_success() {
            return Err(RpcError::Response {
                code: response.code,
                message: response.message,
            });
        }
        response
            .into_typed()
            .map_err(|e| RpcError::Serialization(e.to_string()))
    }

    /// Publish a one-way message: no reply routing, no waiting, no pending
    /// entry. Delivery is still at-least-once once the broker accepts it.
    pub async fn notify<P>(
        &self,
        exchange: &str,
        routing_key: &str,
        target_service: &str,
        payload: &P,
    ) -> Result<(), RpcError>
    where
        P: Serialize + Sync + ?Sized,
    {
        let payload =
            serde_json::to_value(payload).map_err(|e| RpcError::Serialization(e.to_string()))?;
        let header = Header::one_way(&self.identity.service_name, target_service);
        let bytes = Envelope::new(header, payload).to_bytes()?;
        self.transport.publish(exchange, routing_key, bytes).await?;
        debug!(exchange, routing_key, "Published one-way message");
        Ok(())
    }

    /// In-flight calls issued by this client that have not yet resolved.
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }
}
