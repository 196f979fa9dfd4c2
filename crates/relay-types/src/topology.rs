//! Broker topology definitions.
//!
//! One durable topic exchange per domain; one durable request queue per
//! operation, bound under its routing key; one durable reply queue per
//! domain, bound to the same exchange with a routing key equal to its own
//! name.
//!
//! Naming convention: exchange `<domain>.exchange`, request queue
//! `<domain>.<verb>.queue` with routing key `<domain>.<verb>`, reply queue
//! `<domain>.reply.queue`.
//!
//! The canonical topology for all platform services is defined once here.
//! Services must not maintain their own copies; drifted hand-copied lists
//! are exactly the failure mode this module exists to prevent.

use serde::{Deserialize, Serialize};

/// A request queue bound to an exchange, optionally paired with a reply
/// queue for callers in the same domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDefinition {
    /// Request queue name.
    pub queue: String,
    /// Routing key the queue is bound under.
    pub routing_key: String,
    /// Reply queue to declare alongside, bound to the same exchange with a
    /// routing key equal to its own name. `None` means no reply queue.
    pub reply_queue: Option<String>,
}

impl QueueDefinition {
    pub fn new(queue: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            routing_key: routing_key.into(),
            reply_queue: None,
        }
    }

    /// Queue and routing key for `<domain>.<verb>` per the naming convention.
    pub fn for_operation(domain: &str, verb: &str) -> Self {
        Self::new(
            format!("{domain}.{verb}.queue"),
            format!("{domain}.{verb}"),
        )
    }

    /// Attach an explicitly named reply queue.
    pub fn with_reply_queue(mut self, name: impl Into<String>) -> Self {
        self.reply_queue = Some(name.into());
        self
    }

    /// Attach the conventionally named reply queue, `<queue>.reply`.
    pub fn with_conventional_reply(mut self) -> Self {
        self.reply_queue = Some(format!("{}.reply", self.queue));
        self
    }
}

/// A durable topic exchange and the queues bound to it.
///
/// Declared once per service at startup; immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeDefinition {
    pub name: String,
    pub queues: Vec<QueueDefinition>,
}

impl ExchangeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queues: Vec::new(),
        }
    }

    /// Exchange named `<domain>.exchange` per the naming convention.
    pub fn for_domain(domain: &str) -> Self {
        Self::new(format!("{domain}.exchange"))
    }

    pub fn with_queue(mut self, queue: QueueDefinition) -> Self {
        self.queues.push(queue);
        self
    }

    /// The reply queue name of this domain, when one is declared.
    pub fn reply_queue(&self) -> Option<&str> {
        self.queues
            .iter()
            .find_map(|q| q.reply_queue.as_deref())
    }
}

/// The single canonical topology shared by all platform services.
///
/// Each service declares the whole list at startup; declaration is
/// idempotent, so the first service up creates it and the rest verify it.
pub fn canonical_topology() -> Vec<ExchangeDefinition> {
    vec![
        ExchangeDefinition::for_domain("identity")
            .with_queue(
                QueueDefinition::for_operation("identity", "account.create")
                    .with_reply_queue("identity.reply.queue"),
            )
            .with_queue(QueueDefinition::for_operation("identity", "account.activate"))
            .with_queue(QueueDefinition::for_operation("identity", "credential.change")),
        ExchangeDefinition::for_domain("profile")
            .with_queue(
                QueueDefinition::for_operation("profile", "find.by.email")
                    .with_reply_queue("profile.reply.queue"),
            )
            .with_queue(QueueDefinition::for_operation("profile", "create"))
            .with_queue(QueueDefinition::for_operation("profile", "update")),
        ExchangeDefinition::for_domain("document")
            .with_queue(
                QueueDefinition::for_operation("document", "store")
                    .with_reply_queue("document.reply.queue"),
            )
            .with_queue(QueueDefinition::for_operation("document", "fetch")),
        ExchangeDefinition::for_domain("notification")
            .with_queue(
                QueueDefinition::for_operation("notification", "send")
                    .with_reply_queue("notification.reply.queue"),
            ),
        ExchangeDefinition::for_domain("reporting")
            .with_queue(
                QueueDefinition::for_operation("reporting", "generate")
                    .with_reply_queue("reporting.reply.queue"),
            ),
    ]
}
