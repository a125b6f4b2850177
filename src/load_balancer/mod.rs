//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → pool.rs (ServerPool::next_alive_peer, round-robin over alive backends)
//!     → backend.rs (selected Backend, shared via Arc)
//!     → forwarding layer
//!
//! Failure reports and health probes
//!     → pool.rs (mark_backend_status) / backend.rs (set_alive)
//! ```
//!
//! # Design Decisions
//! - Backend sequence is fixed after startup; only liveness flags mutate
//! - Rotation state is a single shared atomic counter, no pool-wide lock
//! - Dead backends are skipped during selection, never removed

pub mod backend;
pub mod pool;

pub use backend::Backend;
pub use pool::ServerPool;
