//! The serving side: consume requests from a queue, invoke the handler,
//! publish the reply.

use futures::FutureExt;
use relay_broker::{BrokerTransport, QueueConsumer};
use relay_types::{codes, Envelope, Header, MessageStatus, Response};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Business failure raised by a request handler.
///
/// Carries the code/message pair that goes out in the error response, so
/// handlers control exactly what remote callers see.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct HandlerError {
    pub code: i32,
    pub message: String,
}

impl HandlerError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(codes::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(codes::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, message)
    }
}

/// A service operation exposed over the broker.
#[async_trait::async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, payload: serde_json::Value) -> Result<serde_json::Value, HandlerError>;
}

/// Adapter turning an async closure into a [`RequestHandler`].
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value, HandlerError>> + Send,
{
    FnHandler { f }
}

#[async_trait::async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value, HandlerError>> + Send,
{
    async fn handle(&self, payload: serde_json::Value) -> Result<serde_json::Value, HandlerError> {
        (self.f)(payload).await
    }
}

/// Consumes one request queue and runs one handler against it.
///
/// Requests are processed sequentially in arrival order for this queue.
/// A handler failure, a handler panic, or an unroutable reply never stops
/// the loop; only a closed broker connection does.
pub struct RpcServerAdapter {
    transport: Arc<dyn BrokerTransport>,
    service_name: String,
    handler: Arc<dyn RequestHandler>,
    consumer: QueueConsumer,
}

impl RpcServerAdapter {
    pub fn new(
        transport: Arc<dyn BrokerTransport>,
        service_name: impl Into<String>,
        handler: Arc<dyn RequestHandler>,
        consumer: QueueConsumer,
    ) -> Self {
        Self {
            transport,
            service_name: service_name.into(),
            handler,
            consumer,
        }
    }

    /// Serve until the broker connection closes.
    pub async fn run(mut self) {
        info!(
            queue = %self.consumer.queue(),
            service = %self.service_name,
            "RPC server adapter started"
        );

        while let Some(delivery) = self.consumer.recv().await {
            let envelope = match Envelope::from_bytes(&delivery.payload) {
                Ok(envelope) => envelope,
                Err(e) => {
                    // Without a header there is no reply address and no
                    // correlation ID; the caller's timeout covers this.
                    warn!(
                        queue = %self.consumer.queue(),
                        error = %e,
                        "Dropping malformed request"
                    );
                    continue;
                }
            };
            self.serve_one(envelope).await;
        }

        info!(queue = %self.consumer.queue(), "RPC server adapter stopped; connection closed");
    }

    async fn serve_one(&self, envelope: Envelope) {
        let request = envelope.header;
        let correlation_id = request.correlation_id;

        let outcome = AssertUnwindSafe(self.handler.handle(envelope.payload))
            .catch_unwind()
            .await;
        let response: Response<serde_json::Value> = match outcome {
            Ok(Ok(data)) => Response::success(data),
            Ok(Err(e)) => {
                debug!(
                    correlation_id = %correlation_id,
                    code = e.code,
                    "Handler returned business error"
                );
                Response::error(e.code, e.message)
            }
            Err(_) => {
                error!(
                    correlation_id = %correlation_id,
                    queue = %self.consumer.queue(),
                    "Handler panicked"
                );
                Response::error(codes::INTERNAL_ERROR, "internal handler failure")
            }
        };

        if !request.expects_reply() {
            return;
        }

        let status = if response.is_success() {
            MessageStatus::Success
        } else {
            MessageStatus::Error
        };
        let payload = match serde_json::to_value(&response) {
            Ok(payload) => payload,
            Err(e) => {
                error!(correlation_id = %correlation_id, error = %e, "Reply encoding failed");
                return;
            }
        };
        let reply = Envelope::new(Header::reply_to(&request, &self.service_name, status), payload);
        let bytes = match reply.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(correlation_id = %correlation_id, error = %e, "Reply encoding failed");
                return;
            }
        };

        if let Err(e) = self
            .transport
            .publish(&request.reply_exchange, &request.reply_to, bytes)
            .await
        {
            warn!(
                correlation_id = %correlation_id,
                reply_exchange = %request.reply_exchange,
                reply_to = %request.reply_to,
                error = %e,
                "Reply publish failed"
            );
        }
    }
}
