//! Unified error handling for the lifeline crate
//!
//! Domain-specific errors (attempt classification, catalog construction, the
//! aggregated exhaustion failure) are wrapped into a single [`Error`] enum
//! usable across module boundaries, with a recoverability classification for
//! callers deciding whether to retry at a higher level.

use std::io;
use thiserror::Error;

pub use crate::client::error::{
    AttemptError, AttemptRecord, ExhaustedError, FailureDiagnosis, FailureKind,
};
pub use crate::endpoint::CatalogError;

/// Unified error type for the lifeline crate
#[derive(Error, Debug)]
pub enum Error {
    /// A single attempt failed
    #[error("Attempt error: {0}")]
    Attempt(#[from] AttemptError),

    /// Every endpoint and retry round was exhausted
    #[error(transparent)]
    Exhausted(#[from] ExhaustedError),

    /// Endpoint catalog construction failed
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error is recoverable (worth retrying at a higher level)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Attempt(e) => match e {
                AttemptError::Timeout(_) | AttemptError::Dns(_) | AttemptError::Network(_) => true,
                AttemptError::HttpStatus(status) => {
                    matches!(status, 429 | 500 | 502 | 503 | 504)
                }
            },
            // The orchestrator already spent its full retry budget
            Self::Exhausted(_) => false,
            Self::Http(_) => true,
            Self::Io(_) => true,
            Self::Catalog(_) | Self::Json(_) | Self::Config(_) => false,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
