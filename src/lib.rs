//! lifeline - Resilient API connectivity layer
//!
//! Reaches a remote API despite unreliable DNS, transient network failures,
//! and multiple candidate server addresses.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and bundled defaults
//! - [`endpoint`] - The fixed priority-ordered catalog of API addresses
//! - [`resolve`] - Hostname→IP resolution cache with TTL and persistence
//! - [`client`] - Bounded attempt execution and the fallback orchestrator
//! - [`health`] - Reachability probes and online/fallback/offline status
//! - [`error`] - Unified error types
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lifeline::config::Config;
//! use lifeline::client::{ApiRequest, Orchestrator};
//! use lifeline::endpoint::EndpointCatalog;
//! use lifeline::resolve::{FileStore, ResolutionCache, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let catalog = EndpointCatalog::new(
//!         &config.connectivity.primary_base,
//!         &config.connectivity.fallback_base,
//!     )?;
//!     let cache = Arc::new(ResolutionCache::new(
//!         Box::new(FileStore::new(&config.cache.snapshot_path)),
//!         Box::new(SystemClock),
//!     ));
//!     let orchestrator = Orchestrator::new(catalog, cache, config.attempt_timeout())?;
//!     let response = orchestrator.execute(&ApiRequest::get("/ping")).await?;
//!     println!("reached API: HTTP {}", response.status());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod commands;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod health;
pub mod resolve;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{ApiRequest, ExhaustedError, Orchestrator, RetryPolicy};
    pub use crate::config::Config;
    pub use crate::endpoint::{Endpoint, EndpointCatalog, EndpointKind};
    pub use crate::error::{Error, Result};
    pub use crate::health::{ApiStatus, HealthProber, HealthReport, NetworkHint};
    pub use crate::resolve::{FileStore, ResolutionCache, SystemClock};
}

// Direct re-exports for convenience
pub use error::{Error, Result};
