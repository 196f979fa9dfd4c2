//! In-memory topic broker.
//!
//! Implements [`BrokerTransport`] with AMQP-style semantics for
//! single-process operation and tests:
//!
//! - durable topic exchanges with `*`/`#` routing-key wildcards
//! - one delivery per matching binding, so a queue bound twice under
//!   overlapping patterns receives duplicates (at-least-once)
//! - no ordering between independent publishes
//! - idempotent declaration; conflicting redeclaration fails
//! - unroutable publishes are dropped, as a topic exchange does without the
//!   mandatory flag
//!
//! [`InMemoryBroker::sever`] simulates losing the broker connection: every
//! subsequent operation fails with [`TransportError::Disconnected`].

use crate::transport::{BrokerTransport, Delivery, QueueConsumer, TransportError};
use crate::DEFAULT_QUEUE_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, warn};

struct Binding {
    routing_key: String,
    queue: String,
}

struct ExchangeState {
    durable: bool,
    bindings: Vec<Binding>,
}

struct QueueState {
    durable: bool,
    sender: mpsc::Sender<Delivery>,
    /// Taken by the first (and only) consumer.
    receiver: Option<mpsc::Receiver<Delivery>>,
}

#[derive(Default)]
struct BrokerState {
    exchanges: HashMap<String, ExchangeState>,
    queues: HashMap<String, QueueState>,
}

/// In-memory implementation of [`BrokerTransport`].
pub struct InMemoryBroker {
    state: RwLock<BrokerState>,
    connected: AtomicBool,
    published: AtomicU64,
    capacity: usize,
}

impl InMemoryBroker {
    /// Create a broker with the default per-queue capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a broker with a specific per-queue capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(BrokerState::default()),
            connected: AtomicBool::new(true),
            published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Simulate losing the broker connection. Every subsequent operation
    /// fails with [`TransportError::Disconnected`].
    pub fn sever(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Total messages accepted by `publish`.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Disconnected)
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerTransport for InMemoryBroker {
    async fn declare_exchange(&self, name: &str, durable: bool) -> Result<(), TransportError> {
        self.ensure_connected()?;
        let mut state = self.state.write();
        match state.exchanges.get(name) {
            Some(existing) if existing.durable == durable => Ok(()),
            Some(_) => Err(TransportError::ExchangeConflict { name: name.into() }),
            None => {
                debug!(exchange = name, durable, "Declared exchange");
                state.exchanges.insert(
                    name.to_string(),
                    ExchangeState {
                        durable,
                        bindings: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn declare_queue(&self, name: &str, durable: bool) -> Result<(), TransportError> {
        self.ensure_connected()?;
        let mut state = self.state.write();
        match state.queues.get(name) {
            Some(existing) if existing.durable == durable => Ok(()),
            Some(_) => Err(TransportError::QueueConflict { name: name.into() }),
            None => {
                let (sender, receiver) = mpsc::channel(self.capacity);
                debug!(queue = name, durable, "Declared queue");
                state.queues.insert(
                    name.to_string(),
                    QueueState {
                        durable,
                        sender,
                        receiver: Some(receiver),
                    },
                );
                Ok(())
            }
        }
    }

    async fn bind_queue(
        &self,
        exchange: &str,
        queue: &str,
        routing_key: &str,
    ) -> Result<(), TransportError> {
        self.ensure_connected()?;
        let mut state = self.state.write();
        if !state.queues.contains_key(queue) {
            return Err(TransportError::QueueNotFound {
                name: queue.into(),
            });
        }
        let Some(exchange_state) = state.exchanges.get_mut(exchange) else {
            return Err(TransportError::ExchangeNotFound {
                name: exchange.into(),
            });
        };

        let exists = exchange_state
            .bindings
            .iter()
            .any(|b| b.routing_key == routing_key && b.queue == queue);
        if !exists {
            debug!(exchange, queue, routing_key, "Bound queue");
            exchange_state.bindings.push(Binding {
                routing_key: routing_key.to_string(),
                queue: queue.to_string(),
            });
        }
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        self.ensure_connected()?;
        let state = self.state.read();
        let Some(exchange_state) = state.exchanges.get(exchange) else {
            return Err(TransportError::ExchangeNotFound {
                name: exchange.into(),
            });
        };

        self.published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0usize;
        for binding in &exchange_state.bindings {
            if !routing_key_matches(&binding.routing_key, routing_key) {
                continue;
            }
            let Some(queue_state) = state.queues.get(&binding.queue) else {
                continue;
            };
            let delivery = Delivery {
                routing_key: routing_key.to_string(),
                payload: payload.clone(),
            };
            match queue_state.sender.try_send(delivery) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    // Queue full or consumer side dropped; the message is
                    // lost on this binding.
                    warn!(
                        exchange,
                        queue = %binding.queue,
                        routing_key,
                        error = %e,
                        "Delivery dropped"
                    );
                }
            }
        }

        if delivered == 0 {
            debug!(exchange, routing_key, "Unroutable message dropped");
        }
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<QueueConsumer, TransportError> {
        self.ensure_connected()?;
        let mut state = self.state.write();
        let Some(queue_state) = state.queues.get_mut(queue) else {
            return Err(TransportError::QueueNotFound {
                name: queue.into(),
            });
        };
        match queue_state.receiver.take() {
            Some(receiver) => Ok(QueueConsumer::new(queue, receiver)),
            None => Err(TransportError::ConsumerAlreadyAttached {
                queue: queue.into(),
            }),
        }
    }
}

/// Topic routing-key match: `*` matches exactly one dot-separated word,
/// `#` matches zero or more words.
pub fn routing_key_matches(pattern: &str, key: &str) -> bool {
    fn matches(pattern: &[&str], key: &[&str]) -> bool {
        match pattern.first() {
            None => key.is_empty(),
            Some(&"#") => {
                // '#' absorbs zero words, or one word and stays in play.
                matches(&pattern[1..], key) || (!key.is_empty() && matches(pattern, &key[1..]))
            }
            Some(&word) => match key.first() {
                Some(&key_word) if word == "*" || word == key_word => {
                    matches(&pattern[1..], &key[1..])
                }
                _ => false,
            },
        }
    }

    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = key.split('.').collect();
    matches(&pattern, &key)
}
