//! # Relay Test Suite
//!
//! Integration tests exercising the full RPC path: topology declaration,
//! request publish, server handling, reply routing, and pending-call
//! resolution, all over the in-memory broker.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── rpc_flows.rs    # Happy paths, concurrency, business errors
//!     └── resilience.rs   # Timeouts, late replies, garbage, disconnects
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p relay-tests
//! cargo test -p relay-tests integration::
//! ```

#![allow(dead_code)]
