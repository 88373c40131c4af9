//! Error types for attempts and the fallback orchestrator
//!
//! Individual attempt failures are classified for diagnostics (timeout vs.
//! DNS-shaped vs. HTTP-level vs. other network error), accumulated into an
//! ordered ledger, and only surfaced as a terminal [`ExhaustedError`] once
//! every endpoint and retry round is spent.

use serde::Serialize;
use thiserror::Error;

use crate::endpoint::EndpointKind;

/// Errors from a single bounded attempt
#[derive(Error, Debug)]
pub enum AttemptError {
    /// Attempt exceeded its bound and the in-flight call was cancelled
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Network error whose message suggests a name-resolution failure
    #[error("Name resolution failure: {0}")]
    Dns(String),

    /// Response received but not ok
    #[error("Server returned HTTP {0}")]
    HttpStatus(u16),

    /// Any other network-level error
    #[error("Network error: {0}")]
    Network(String),
}

impl AttemptError {
    /// Classify a transport error from the HTTP client
    pub fn from_reqwest(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            return Self::Timeout(timeout_ms);
        }

        let message = full_message(err);
        if looks_like_dns_failure(&message) {
            Self::Dns(message)
        } else {
            Self::Network(message)
        }
    }

    /// Whether the error suggests a DNS problem rather than a down server
    pub fn is_dns_shaped(&self) -> bool {
        matches!(self, Self::Dns(_))
    }

    /// HTTP status code, when a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus(code) => Some(*code),
            _ => None,
        }
    }

    /// Coarse failure classification for the attempt ledger
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Dns(_) => FailureKind::Dns,
            Self::HttpStatus(_) => FailureKind::Http,
            Self::Network(_) => FailureKind::Network,
        }
    }
}

/// Coarse classification of one failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Timeout,
    Dns,
    Http,
    Network,
}

/// One failed attempt, as recorded in the aggregated failure report
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    /// Endpoint kind the attempt belongs to
    pub endpoint_kind: EndpointKind,

    /// Concrete URL that was tried
    pub url: String,

    /// Human-readable attempt label
    pub label: String,

    /// Failure classification
    pub kind: FailureKind,

    /// HTTP status, when a response was received
    pub status: Option<u16>,

    /// Error message for operator diagnosis
    pub error: String,

    /// Wall time the attempt took
    pub elapsed_ms: u64,
}

/// Which layer the aggregated failure points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureDiagnosis {
    /// Caller-supplied signal says the local network is down
    NetworkOffline,

    /// DNS-shaped failures were observed on domain-based attempts
    DnsSuspected,

    /// Every route failed without a DNS signature
    AllServersUnreachable,

    /// No attempts were made (empty catalog)
    Unknown,
}

impl FailureDiagnosis {
    /// Actionable message for the caller to render
    pub fn message(&self) -> &'static str {
        match self {
            Self::NetworkOffline => "Network is offline",
            Self::DnsSuspected => "DNS resolution failure suspected for API domains",
            Self::AllServersUnreachable => "All API servers are unreachable",
            Self::Unknown => "API unreachable for an unknown reason",
        }
    }

    /// Derive a diagnosis from the complete attempt ledger
    pub fn from_records(records: &[AttemptRecord]) -> Self {
        if records.is_empty() {
            return Self::Unknown;
        }

        let dns_on_domain = records.iter().any(|r| {
            r.kind == FailureKind::Dns && r.endpoint_kind != EndpointKind::RawIp
        });
        if dns_on_domain {
            Self::DnsSuspected
        } else {
            Self::AllServersUnreachable
        }
    }
}

/// Terminal failure after every endpoint and retry round is exhausted
///
/// Carries the ordered list of every attempt, so an operator can see which
/// layer (DNS, a specific mirror, the IP route) is broken.
#[derive(Debug)]
pub struct ExhaustedError {
    /// Every failed attempt, in the order it was made
    pub attempts: Vec<AttemptRecord>,

    /// Which layer the failure points at
    pub diagnosis: FailureDiagnosis,
}

impl ExhaustedError {
    /// Build the terminal error, deriving the diagnosis from the ledger
    pub fn new(attempts: Vec<AttemptRecord>) -> Self {
        let diagnosis = FailureDiagnosis::from_records(&attempts);
        Self {
            attempts,
            diagnosis,
        }
    }

    /// Build the terminal error with an explicit diagnosis, overriding the
    /// ledger-derived one; used when an authoritative platform signal (the
    /// network is offline) outranks whatever the attempts look like
    pub fn with_diagnosis(attempts: Vec<AttemptRecord>, diagnosis: FailureDiagnosis) -> Self {
        Self {
            attempts,
            diagnosis,
        }
    }
}

impl std::fmt::Display for ExhaustedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} attempts failed)",
            self.diagnosis.message(),
            self.attempts.len()
        )?;
        for record in &self.attempts {
            write!(f, "; [{}] {}: {}", record.label, record.url, record.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExhaustedError {}

/// Heuristic match on error messages that indicate a name-resolution failure
pub fn looks_like_dns_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("dns")
        || lower.contains("name resolution")
        || lower.contains("name or service not known")
        || lower.contains("failed to lookup address")
        || lower.contains("getaddrinfo")
        || lower.contains("no address associated")
        || lower.contains("nodename nor servname")
}

// Flatten an error and its source chain into one message, so transport
// details (which live in hyper's source errors) survive classification.
fn full_message(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
