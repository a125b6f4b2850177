//! Backend pool and round-robin rotation.
//!
//! # Responsibilities
//! - Own the ordered, fixed-after-startup set of backends
//! - Select the next alive backend round-robin via a shared atomic counter
//! - Flip liveness by backend identity on failure reports

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use url::Url;

use crate::load_balancer::backend::Backend;

/// Ordered set of backends plus the shared rotation counter.
///
/// The backend sequence never changes after startup, so iteration and
/// indexing need no lock; the counter is a single atomic scalar.
#[derive(Debug, Default)]
pub struct ServerPool {
    backends: Vec<Arc<Backend>>,
    current: AtomicUsize,
}

impl ServerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a backend. Startup only: `&mut self` keeps this out of the
    /// concurrent request phase by construction.
    pub fn add_backend(&mut self, backend: Arc<Backend>) {
        self.backends.push(backend);
    }

    /// All backends in pool order, for the health monitor's sweep.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Select the next alive backend round-robin.
    ///
    /// Advances the shared counter by one and scans at most one full lap
    /// from the counter's previous position, wrapping modulo pool length.
    /// When the first alive backend sits past the scan start (some backends
    /// down), the counter is fast-forwarded to just after it so an
    /// unrelated later call continues from there instead of rescanning the
    /// dead prefix. Two racing calls can both fast-forward and leave the
    /// counter at a position neither produced; rotation stays fair within
    /// one lap, which is the only guarantee made here.
    ///
    /// `None` after a full lap with nothing alive. That is a legal terminal
    /// outcome ("no peer available"), not an error to retry.
    pub fn next_alive_peer(&self) -> Option<Arc<Backend>> {
        let len = self.backends.len();
        if len == 0 {
            return None;
        }

        let start = self.current.fetch_add(1, Ordering::Relaxed) % len;
        for offset in 0..len {
            let idx = (start + offset) % len;
            let backend = &self.backends[idx];
            if backend.is_alive() {
                if idx != start {
                    self.current.store(idx + 1, Ordering::Relaxed);
                }
                return Some(backend.clone());
            }
        }
        None
    }

    /// Set the liveness of the backend whose URL matches `url` exactly.
    ///
    /// Linear scan, first match wins; silently a no-op when nothing
    /// matches, so a stale failure report against a URL no longer in the
    /// pool cannot fault.
    pub fn mark_backend_status(&self, url: &Url, alive: bool) {
        for backend in &self.backends {
            if backend.url() == url {
                backend.set_alive(alive);
                break;
            }
        }
    }
}
