//! Reply dispatcher: drains the service's reply queue and completes
//! pending calls.
//!
//! One dispatcher runs per service process. It is the only consumer of the
//! reply queue, so completion for any given correlation ID happens at most
//! once even though the broker may deliver duplicates.

use crate::pending::PendingCallStore;
use relay_broker::QueueConsumer;
use relay_types::Envelope;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ReplyDispatcher {
    consumer: QueueConsumer,
    pending: Arc<PendingCallStore>,
}

impl ReplyDispatcher {
    pub fn new(consumer: QueueConsumer, pending: Arc<PendingCallStore>) -> Self {
        Self { consumer, pending }
    }

    /// Consume replies until the broker connection closes.
    ///
    /// Undecodable payloads and replies with no matching pending call are
    /// logged and dropped; neither stops the loop.
    pub async fn run(mut self) {
        info!(queue = %self.consumer.queue(), "Reply dispatcher started");

        while let Some(delivery) = self.consumer.recv().await {
            let envelope = match Envelope::from_bytes(&delivery.payload) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(
                        queue = %self.consumer.queue(),
                        error = %e,
                        "Dropping undecodable reply"
                    );
                    continue;
                }
            };

            let correlation_id = envelope.header.correlation_id;
            let completed = self.pending.complete(correlation_id, envelope.payload);
            if !completed {
                // Unknown, duplicate, or post-timeout. All harmless.
                warn!(
                    correlation_id = %correlation_id,
                    source = %envelope.header.source_service,
                    "Dropping reply with no pending call"
                );
            }
        }

        info!(queue = %self.consumer.queue(), "Reply dispatcher stopped; connection closed");
    }
}
