//! # Relay RPC - Request/Response over the Broker
//!
//! Synchronous inter-service calls on top of an asynchronous, at-least-once,
//! unordered broker transport.
//!
//! ## Call Flow
//!
//! ```text
//! caller task                     broker                    remote service
//! ───────────                     ──────                    ──────────────
//! register pending call
//! publish request ─────────────▶ route by key ───────────▶ handler runs
//! await (bounded by timeout)                                reply published
//!        ◀──────────────────────  reply queue  ◀──────────────────┘
//! reply dispatcher completes
//! the pending call
//! ```
//!
//! Correlation IDs pair each reply with its call; replies that match nothing
//! (late, duplicate, unknown) are logged and dropped. A call resolves exactly
//! once: with the reply, with a timeout, or with a connection error.
//!
//! Start with [`RpcNode`] to assemble the pieces, or wire
//! [`RpcClient`], [`ReplyDispatcher`], and [`RpcServerAdapter`] by hand.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod node;
pub mod pending;
pub mod registrar;
pub mod server;

pub use client::RpcClient;
pub use config::{RpcConfig, ServiceIdentity, DEFAULT_CALL_TIMEOUT, DEFAULT_SWEEP_INTERVAL};
pub use dispatcher::ReplyDispatcher;
pub use node::RpcNode;
pub use pending::{PendingCallStore, PendingReply, PendingStats};
pub use registrar::declare_topology;
pub use server::{handler_fn, FnHandler, HandlerError, RequestHandler, RpcServerAdapter};
