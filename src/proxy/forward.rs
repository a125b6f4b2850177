//! Request forwarding to a selected backend.
//!
//! # Responsibilities
//! - Rewrite the inbound request's URI to target the chosen backend
//! - Issue the outbound call and hand the response back untouched
//! - Collapse every transport-level failure into one error signal the
//!   escalation policy can act on

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::request::Parts;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{Request, Uri};
use axum::response::Response;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::load_balancer::Backend;

/// Failure of a single forward call. Every variant is a transport failure
/// from the dispatcher's point of view.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream address: {0}")]
    Address(String),

    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
}

/// The forwarding capability: given a backend and a request, perform the
/// network call and return the backend's response or a transport error.
///
/// The inbound body arrives pre-buffered so the dispatcher can replay it on
/// retry.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(
        &self,
        backend: &Backend,
        head: &Parts,
        body: Bytes,
    ) -> Result<Response, ForwardError>;
}

/// Production forwarder backed by a hyper connection-pooling client.
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
}

impl HttpForwarder {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HttpForwarder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(
        &self,
        backend: &Backend,
        head: &Parts,
        body: Bytes,
    ) -> Result<Response, ForwardError> {
        let uri = rewrite_uri(&head.uri, backend)?;

        let mut builder = Request::builder().method(head.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            // Headers pass through verbatim, Host included.
            for (name, value) in head.headers.iter() {
                headers.append(name.clone(), value.clone());
            }
        }
        let request = builder
            .body(Body::from(body))
            .map_err(|e| ForwardError::Address(e.to_string()))?;

        let response = self.client.request(request).await?;
        Ok(response.map(Body::new))
    }
}

/// Retarget the inbound URI at the backend, keeping path and query.
fn rewrite_uri(original: &Uri, backend: &Backend) -> Result<Uri, ForwardError> {
    let url = backend.url();
    let host = url
        .host_str()
        .ok_or_else(|| ForwardError::Address(format!("{url} has no host")))?;
    let authority = match url.port_or_known_default() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut parts = original.clone().into_parts();
    parts.scheme = Some(
        Scheme::try_from(url.scheme()).map_err(|e| ForwardError::Address(e.to_string()))?,
    );
    parts.authority = Some(
        Authority::try_from(authority.as_str())
            .map_err(|e| ForwardError::Address(e.to_string()))?,
    );
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }

    Uri::from_parts(parts).map_err(|e| ForwardError::Address(e.to_string()))
}
