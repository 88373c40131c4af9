//! Single bounded network attempt against one concrete URL
//!
//! The executor performs exactly one call, classifies the outcome, and
//! opportunistically records discovered IP routes in the resolution cache.
//! It never retries; retry policy belongs to the orchestrator.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::resolve::ResolutionCache;

use super::error::AttemptError;

/// Method, headers, and body for one attempt
///
/// Body bytes are cheaply cloneable so the same request can be replayed
/// against successive endpoints.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestOptions {
    /// A bare GET with no extra headers
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Executes one bounded-time network call
pub struct AttemptExecutor {
    client: Client,
    cache: Arc<ResolutionCache>,
    timeout: Duration,
}

impl AttemptExecutor {
    /// Create an executor sharing the given client and resolution cache
    pub fn new(client: Client, cache: Arc<ResolutionCache>, timeout: Duration) -> Self {
        Self {
            client,
            cache,
            timeout,
        }
    }

    /// Per-attempt bound
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform one attempt against a concrete URL
    ///
    /// The wait is bounded by the per-attempt timeout; exceeding it cancels
    /// the in-flight call and reports [`AttemptError::Timeout`] rather than a
    /// generic error. On success against a raw-IP URL with a
    /// `cacheable_hostname` supplied, the IP is extracted from the URL and
    /// written into the resolution cache, turning an opportunistic fallback
    /// success into a future fast path.
    pub async fn attempt(
        &self,
        url: &Url,
        options: &RequestOptions,
        label: &str,
        cacheable_hostname: Option<&str>,
    ) -> Result<Response, AttemptError> {
        let started = Instant::now();

        let mut request = self
            .client
            .request(options.method.clone(), url.clone())
            .headers(options.headers.clone());
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        // The timeout is the cancellation scope for this attempt only;
        // dropping the in-flight future aborts the call.
        let outcome = tokio::time::timeout(self.timeout, request.send()).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                tracing::warn!(url = %url, label = %label, timeout_ms, "Attempt timed out");
                Err(AttemptError::Timeout(timeout_ms))
            }
            Ok(Err(e)) => {
                let error = AttemptError::from_reqwest(&e, self.timeout.as_millis() as u64);
                tracing::warn!(
                    url = %url,
                    label = %label,
                    elapsed_ms,
                    error = %error,
                    "Attempt failed"
                );
                Err(error)
            }
            Ok(Ok(response)) => {
                let status = response.status();
                if !status.is_success() {
                    tracing::warn!(
                        url = %url,
                        label = %label,
                        status = status.as_u16(),
                        elapsed_ms,
                        "Attempt returned non-ok status"
                    );
                    return Err(AttemptError::HttpStatus(status.as_u16()));
                }

                if let Some(hostname) = cacheable_hostname {
                    if let Some(ip) = ip_from_url(url) {
                        tracing::info!(
                            hostname = %hostname,
                            ip = %ip,
                            label = %label,
                            "Recording IP route after direct-IP success"
                        );
                        self.cache.set(hostname, &ip).await;
                    }
                }

                tracing::debug!(url = %url, label = %label, elapsed_ms, "Attempt succeeded");
                Ok(response)
            }
        }
    }
}

/// Extract the host as an IP literal, if the URL connects by IP
pub fn ip_from_url(url: &Url) -> Option<String> {
    match url.host() {
        Some(url::Host::Ipv4(addr)) => Some(addr.to_string()),
        Some(url::Host::Ipv6(addr)) => Some(addr.to_string()),
        _ => None,
    }
}
