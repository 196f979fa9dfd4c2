//! Topology registrar.
//!
//! Declares the durable exchanges, queues, and bindings a node relies on.
//! Every node declares the full topology it uses at startup, so no single
//! process is a prerequisite for the others; identical redeclaration is a
//! no-op at the transport.

use relay_broker::{BrokerTransport, TransportError};
use relay_types::ExchangeDefinition;
use tracing::info;

/// Declare every exchange, queue, and binding in `topology`, in order.
///
/// Stops at the first failure. Declarations already made stay in place,
/// so a retry after a transient failure converges.
pub async fn declare_topology(
    transport: &dyn BrokerTransport,
    topology: &[ExchangeDefinition],
) -> Result<(), TransportError> {
    for exchange in topology {
        transport.declare_exchange(&exchange.name, true).await?;
        for queue in &exchange.queues {
            transport.declare_queue(&queue.queue, true).await?;
            transport
                .bind_queue(&exchange.name, &queue.queue, &queue.routing_key)
                .await?;
            if let Some(reply_queue) = &queue.reply_queue {
                transport.declare_queue(reply_queue, true).await?;
                // Reply queues are bound under their own name, which is what
                // request headers carry in `replyTo`.
                transport
                    .bind_queue(&exchange.name, reply_queue, reply_queue)
                    .await?;
            }
        }
        info!(
            exchange = %exchange.name,
            queues = exchange.queues.len(),
            "Declared exchange topology"
        );
    }
    Ok(())
}
