//! rotor — a round-robin reverse-proxy load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌────────────────────────────────────────────┐
//!                  │                   ROTOR                     │
//!  Client Request  │  ┌────────┐   ┌──────────┐   ┌──────────┐  │
//!  ────────────────┼─▶│ proxy  │──▶│ dispatch │──▶│  load_   │  │
//!                  │  │ server │   │  loop    │   │ balancer │  │
//!                  │  └────────┘   └────┬─────┘   └────┬─────┘  │
//!                  │                    │              │        │
//!                  │                    ▼              │        │
//!  Client Response │               ┌──────────┐        │        │     Backend
//!  ◀───────────────┼───────────────│ forward  │◀───────┘        │──▶  Servers
//!                  │               └──────────┘                 │
//!                  │  ┌──────────────────────────────────────┐  │
//!                  │  │  config        health monitor (task) │  │
//!                  │  └──────────────────────────────────────┘  │
//!                  └────────────────────────────────────────────┘
//! ```
//!
//! Requests rotate round-robin across configured backends, skipping any the
//! health monitor or the failure-escalation path has marked dead. Transport
//! failures are retried against the same backend a bounded number of times,
//! then the backend is taken out of rotation and the request moves on,
//! bounded again by a hard attempt ceiling.

pub mod config;
pub mod health;
pub mod load_balancer;
pub mod proxy;

pub use config::ProxyConfig;
pub use load_balancer::{Backend, ServerPool};
pub use proxy::HttpServer;
