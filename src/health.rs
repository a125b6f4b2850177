//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend's reachability
//! - Flip each backend's liveness flag to match the probe result
//!
//! # Design Decisions
//! - The probe is a bare TCP connect, not an HTTP request: the belief being
//!   maintained is "accepts connections", nothing more
//! - Probes run sequentially but each is timeout-bounded, so one hung
//!   backend delays a sweep by at most the probe timeout
//! - The monitor runs for the life of the process; there is no shutdown
//!   contract

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::time;
use url::Url;

use crate::config::HealthCheckConfig;
use crate::load_balancer::ServerPool;

/// Background task that keeps backend liveness flags current.
pub struct HealthMonitor {
    pool: Arc<ServerPool>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(pool: Arc<ServerPool>, config: HealthCheckConfig) -> Self {
        Self { pool, config }
    }

    /// Run forever, sweeping the pool once per period. The first sweep
    /// fires one full period after startup; backends start out alive and
    /// the failure-escalation path can evict a dead one sooner.
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.config.interval_secs,
            probe_timeout_secs = self.config.probe_timeout_secs,
            "health monitor starting"
        );

        let period = self.config.interval();
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            tracing::debug!("starting health check");
            self.check_all().await;
            tracing::debug!("health check completed");
        }
    }

    /// Probe every backend once and record the result.
    pub async fn check_all(&self) {
        for backend in self.pool.backends() {
            let alive = probe_backend(backend.url(), self.config.probe_timeout()).await;
            backend.set_alive(alive);
            tracing::info!(
                backend = %backend.url(),
                status = if alive { "up" } else { "down" },
                "health check"
            );
        }
    }
}

/// True when a TCP connection to the backend's host:port opens within the
/// timeout.
pub async fn probe_backend(url: &Url, timeout: std::time::Duration) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let Some(port) = url.port_or_known_default() else {
        return false;
    };

    match time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::warn!(backend = %url, error = %e, "backend unreachable");
            false
        }
        Err(_) => {
            tracing::warn!(backend = %url, "backend probe timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::Backend;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn probe_succeeds_against_listening_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = Url::parse(&format!("http://{}", addr)).unwrap();

        assert!(probe_backend(&url, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn probe_fails_against_closed_port() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{}", addr)).unwrap();

        assert!(!probe_backend(&url, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn sweep_updates_liveness_both_ways() {
        let live = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let live_addr = live.local_addr().unwrap();
        let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = dead.local_addr().unwrap();
        drop(dead);

        let mut pool = ServerPool::new();
        pool.add_backend(Arc::new(Backend::new(
            Url::parse(&format!("http://{}", live_addr)).unwrap(),
        )));
        pool.add_backend(Arc::new(Backend::new(
            Url::parse(&format!("http://{}", dead_addr)).unwrap(),
        )));
        // Start from the wrong beliefs; one sweep must correct both.
        pool.backends()[0].set_alive(false);
        assert!(pool.backends()[1].is_alive());

        let pool = Arc::new(pool);
        let monitor = HealthMonitor::new(pool.clone(), HealthCheckConfig::default());
        monitor.check_all().await;

        assert!(pool.backends()[0].is_alive());
        assert!(!pool.backends()[1].is_alive());
    }
}
