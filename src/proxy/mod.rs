//! Proxy subsystem: HTTP entry point, dispatch, and forwarding.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → server.rs (axum handler, buffer body, capture client address)
//!     → dispatch.rs (select peer, forward, retry / escalate, bounded)
//!     → forward.rs (rewrite URI to the selected backend, issue the call)
//!     → backend response passed through verbatim, or 503 on exhaustion
//! ```
//!
//! # Design Decisions
//! - Dispatch is an explicit bounded loop, never recursion: the attempt
//!   ceiling is visible in the loop condition
//! - Attempt/retry counters travel in a typed per-request struct
//! - Forwarding sits behind a trait so the dispatch loop is testable
//!   without a network

pub mod dispatch;
pub mod forward;
pub mod server;

pub use dispatch::{dispatch, AttemptContext};
pub use forward::{ForwardError, Forwarder, HttpForwarder};
pub use server::HttpServer;
