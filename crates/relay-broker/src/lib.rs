//! # Relay Broker - Transport Boundary for Inter-Service RPC
//!
//! Services never address one another directly; every message goes through
//! a broker of durable topic exchanges, queues, and bindings.
//!
//! ```text
//! ┌──────────────┐                         ┌──────────────┐
//! │  Service A   │                         │  Service B   │
//! │              │  publish(exchange, rk)  │              │
//! │              │ ──────┐                 │              │
//! └──────────────┘       │                 └──────────────┘
//!                        ▼                         ↑
//!                  ┌──────────────┐               │
//!                  │    Broker    │               │
//!                  │ exchanges +  │ ──────────────┘
//!                  │   bindings   │   consume(queue)
//!                  └──────────────┘
//! ```
//!
//! This crate defines the [`BrokerTransport`] trait the RPC core is written
//! against, and [`InMemoryBroker`], an implementation with AMQP-style
//! semantics (topic routing with `*`/`#` wildcards, at-least-once delivery,
//! no ordering between independent publishes). Suitable for single-process
//! operation and tests; a distributed deployment would implement the same
//! trait over a real broker connection.

pub mod memory;
pub mod transport;

pub use memory::InMemoryBroker;
pub use transport::{BrokerTransport, Delivery, QueueConsumer, TransportError};

/// Maximum messages buffered per queue before deliveries are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
