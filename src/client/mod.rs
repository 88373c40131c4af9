//! Resilient request execution against the endpoint catalog
//!
//! Two layers with deliberately separate concerns:
//!
//! - [`attempt`] performs exactly one bounded network call and classifies
//!   the outcome; it never retries.
//! - [`orchestrator`] owns retry policy: the catalog walk, cached-IP
//!   shortcuts, backoff rounds, and the aggregated terminal failure.

pub mod attempt;
pub mod error;
pub mod orchestrator;

pub use attempt::{AttemptExecutor, RequestOptions};
pub use error::{AttemptError, AttemptRecord, ExhaustedError, FailureDiagnosis, FailureKind};
pub use orchestrator::{ApiRequest, Orchestrator, RetryPolicy};
