//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (semantic checks: backend URLs parse, list non-empty)
//!     → ProxyConfig (validated, immutable)
//!     → consumed by server / health monitor at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload
//! - All fields have defaults so a minimal (or absent) config works
//! - Defaults mirror the fixed constants of the design: 30 s health period,
//!   2 s probe timeout, 10 ms retry backoff, retry and attempt ceilings of 3

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use schema::{DispatchConfig, HealthCheckConfig, ListenerConfig, ProxyConfig, TimeoutConfig};
