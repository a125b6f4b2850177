//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Track liveness (alive/dead) under concurrent readers and writers

use std::sync::RwLock;

use url::Url;

/// A single upstream server the proxy can forward to.
///
/// The URL is immutable after creation; only the liveness flag mutates.
/// Liveness is written by the health monitor and the failure-escalation
/// path, and read on every peer selection, so it sits behind a per-backend
/// `RwLock`: readers run concurrently with each other but a write is
/// exclusive with every other access. A read may be stale the moment it
/// returns; liveness is eventually consistent by nature.
#[derive(Debug)]
pub struct Backend {
    url: Url,
    alive: RwLock<bool>,
}

impl Backend {
    /// Create a new backend, initially alive.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            alive: RwLock::new(true),
        }
    }

    /// The backend's base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Unconditionally set the liveness flag.
    pub fn set_alive(&self, alive: bool) {
        // A poisoned lock is unreachable: no holder can panic while
        // touching a bool.
        *self.alive.write().unwrap_or_else(|e| e.into_inner()) = alive;
    }

    /// Snapshot of the liveness flag.
    pub fn is_alive(&self) -> bool {
        *self.alive.read().unwrap_or_else(|e| e.into_inner())
    }
}
