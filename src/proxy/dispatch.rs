//! Request dispatch and failure escalation.
//!
//! # Responsibilities
//! - Select a peer and forward the request to it
//! - Absorb transient failures with bounded same-backend retries
//! - Escalate persistent failures: mark the backend dead, move to the next
//! - Enforce the hard attempt ceiling so no request loops forever
//!
//! # Design Decisions
//! - Two-tier policy: up to `max_retries` retries against one backend, then
//!   up to `max_attempts` backend trials, then a terminal 503. This bounds
//!   both single-backend thrashing and cross-backend cascades.
//! - One explicit loop per request, no recursion; the termination bound is
//!   in the loop head.
//! - Backend responses pass through verbatim, 5xx included. Only transport
//!   errors enter the retry path.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::config::DispatchConfig;
use crate::load_balancer::ServerPool;
use crate::proxy::forward::Forwarder;

/// Per-request attempt bookkeeping, carried by value through the dispatch
/// loop and dropped when the request completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptContext {
    /// Distinct backends tried for this logical request.
    pub attempts: u32,
    /// Same-backend retries within the current backend trial.
    pub retries: u32,
}

/// Drive one logical request to completion: a backend response, or 503 once
/// no peer is available or the attempt ceiling is crossed.
pub async fn dispatch(
    pool: &ServerPool,
    forwarder: &dyn Forwarder,
    policy: &DispatchConfig,
    client: SocketAddr,
    head: &Parts,
    body: Bytes,
) -> Response {
    let path = head.uri.path().to_string();
    let mut ctx = AttemptContext::default();

    loop {
        // SELECT
        if ctx.attempts > policy.max_attempts {
            tracing::warn!(
                client = %client,
                path = %path,
                attempts = ctx.attempts,
                "max attempts reached, terminating"
            );
            return service_unavailable();
        }

        let Some(peer) = pool.next_alive_peer() else {
            tracing::warn!(client = %client, path = %path, "no alive backend available");
            return service_unavailable();
        };

        tracing::info!(client = %client, path = %path, peer = %peer.url(), "forwarding");

        // FORWARD, with bounded same-backend retries. The retry counter is
        // scoped to this trial; a fresh backend gets a fresh budget.
        ctx.retries = 0;
        loop {
            match forwarder.forward(&peer, head, body.clone()).await {
                // SUCCESS: the backend's status passes through as-is.
                Ok(response) => return response,
                Err(err) => {
                    tracing::warn!(
                        peer = %peer.url(),
                        retries = ctx.retries,
                        error = %err,
                        "transport failure"
                    );

                    // RETRY: absorb a transient blip without burning an
                    // attempt.
                    if ctx.retries < policy.max_retries {
                        tokio::time::sleep(policy.retry_backoff()).await;
                        ctx.retries += 1;
                        continue;
                    }

                    // ESCALATE: this backend is out of budget. Remove it
                    // from rotation until the health monitor revives it
                    // and go select a different peer.
                    pool.mark_backend_status(peer.url(), false);
                    ctx.attempts += 1;
                    tracing::warn!(
                        client = %client,
                        path = %path,
                        peer = %peer.url(),
                        attempts = ctx.attempts,
                        "backend marked dead, re-dispatching"
                    );
                    break;
                }
            }
        }
    }
}

fn service_unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::Backend;
    use crate::proxy::forward::ForwardError;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use url::Url;

    /// Forwarder that fails a scripted number of times, then succeeds.
    struct ScriptedForwarder {
        failures: usize,
        calls: AtomicUsize,
    }

    impl ScriptedForwarder {
        fn failing(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
            }
        }

        fn always_failing() -> Self {
            Self::failing(usize::MAX)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Forwarder for ScriptedForwarder {
        async fn forward(
            &self,
            _backend: &Backend,
            _head: &Parts,
            _body: Bytes,
        ) -> Result<Response, ForwardError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ForwardError::Address("connection refused".into()))
            } else {
                Ok((StatusCode::OK, "ok").into_response())
            }
        }
    }

    fn pool_of(n: usize) -> ServerPool {
        let mut pool = ServerPool::new();
        for i in 0..n {
            let url = Url::parse(&format!("http://127.0.0.1:{}", 8081 + i)).unwrap();
            pool.add_backend(Arc::new(Backend::new(url)));
        }
        pool
    }

    fn fast_policy() -> DispatchConfig {
        DispatchConfig {
            max_attempts: 3,
            max_retries: 3,
            retry_backoff_ms: 1,
        }
    }

    fn head() -> Parts {
        let (parts, _) = Request::builder()
            .uri("/work")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        parts
    }

    fn client() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[tokio::test]
    async fn success_on_first_forward() {
        let pool = pool_of(2);
        let forwarder = ScriptedForwarder::failing(0);

        let response = dispatch(
            &pool,
            &forwarder,
            &fast_policy(),
            client(),
            &head(),
            Bytes::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(forwarder.calls(), 1);
    }

    #[tokio::test]
    async fn all_dead_returns_503_without_forwarding() {
        let pool = pool_of(2);
        for b in pool.backends() {
            b.set_alive(false);
        }
        let forwarder = ScriptedForwarder::failing(0);

        let response = dispatch(
            &pool,
            &forwarder,
            &fast_policy(),
            client(),
            &head(),
            Bytes::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(forwarder.calls(), 0);
    }

    #[tokio::test]
    async fn transient_failures_absorbed_by_retries() {
        // Two failures, then success: stays on the same backend, which is
        // never marked dead.
        let pool = pool_of(1);
        let forwarder = ScriptedForwarder::failing(2);

        let response = dispatch(
            &pool,
            &forwarder,
            &fast_policy(),
            client(),
            &head(),
            Bytes::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(forwarder.calls(), 3);
        assert!(pool.backends()[0].is_alive());
    }

    #[tokio::test]
    async fn backend_marked_dead_only_after_retry_budget() {
        // One backend, forwarder never succeeds: 1 initial try + 3 retries,
        // dead on the 4th failure, then 503 since nothing else is alive.
        let pool = pool_of(1);
        let forwarder = ScriptedForwarder::always_failing();

        let response = dispatch(
            &pool,
            &forwarder,
            &fast_policy(),
            client(),
            &head(),
            Bytes::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(forwarder.calls(), 4);
        assert!(!pool.backends()[0].is_alive());
    }

    #[tokio::test]
    async fn escalation_moves_to_next_backend() {
        // First backend exhausts its retry budget (4 failed calls), the
        // second serves the request.
        let pool = pool_of(2);
        let forwarder = ScriptedForwarder::failing(4);

        let response = dispatch(
            &pool,
            &forwarder,
            &fast_policy(),
            client(),
            &head(),
            Bytes::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(forwarder.calls(), 5);
        assert!(!pool.backends()[0].is_alive());
        assert!(pool.backends()[1].is_alive());
    }

    #[tokio::test]
    async fn attempt_ceiling_is_terminal_even_with_alive_backends() {
        // Five alive backends, forwarder never succeeds. Trials run at
        // attempts 0..=3 (four backends, four calls each), then the ceiling
        // trips with the fifth backend still alive and untouched.
        let pool = pool_of(5);
        let forwarder = ScriptedForwarder::always_failing();

        let response = dispatch(
            &pool,
            &forwarder,
            &fast_policy(),
            client(),
            &head(),
            Bytes::new(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(forwarder.calls(), 16);
        let dead = pool.backends().iter().filter(|b| !b.is_alive()).count();
        assert_eq!(dead, 4);
    }

    #[tokio::test]
    async fn backend_error_status_passes_through() {
        struct TeapotForwarder;

        #[async_trait]
        impl Forwarder for TeapotForwarder {
            async fn forward(
                &self,
                _backend: &Backend,
                _head: &Parts,
                _body: Bytes,
            ) -> Result<Response, ForwardError> {
                Ok((StatusCode::IM_A_TEAPOT, "short and stout").into_response())
            }
        }

        let pool = pool_of(1);
        let response = dispatch(
            &pool,
            &TeapotForwarder,
            &fast_policy(),
            client(),
            &head(),
            Bytes::new(),
        )
        .await;

        // Backend status codes are never rewritten, errors included.
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert!(pool.backends()[0].is_alive());
    }
}
