//! # Relay Types Crate
//!
//! This crate contains the wire envelope, the uniform `Response<T>` carrier,
//! the RPC error taxonomy, and the canonical topology definitions shared by
//! every platform service.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-service wire types are defined
//!   here. Services never hand-copy topology lists or response shapes.
//! - **Envelope Integrity**: The `Envelope` is the sole wrapper for every
//!   message published to the broker, in both directions.
//! - **Typed Failures**: Every failure a caller can observe is one of the
//!   fixed `RpcError` kinds; callers never catch transport-library errors.

pub mod correlation;
pub mod envelope;
pub mod errors;
pub mod response;
pub mod topology;

pub use correlation::CorrelationId;
pub use envelope::{Envelope, Header, MessageStatus};
pub use errors::{RpcError, RpcErrorKind};
pub use response::{codes, Response};
pub use topology::{canonical_topology, ExchangeDefinition, QueueDefinition};
