//! Fallback orchestrator: catalog walk plus retry rounds
//!
//! The orchestrator walks the endpoint catalog in priority order, rewriting
//! domain entries through the resolution cache when a fresh IP is known, and
//! repeats the walk with exponential backoff up to the retry budget. The
//! first successful attempt wins; only after every endpoint and every round
//! is exhausted does it fail, with the complete attempt ledger attached.
//!
//! Concurrent calls are independent; each runs its own full walk. The only
//! shared state is the resolution cache, whose entries are advisory hints.

use bytes::Bytes;
use reqwest::header::{HeaderValue, ACCEPT, CONNECTION, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::endpoint::{Endpoint, EndpointCatalog, EndpointKind, CHAT_PATH, HOST_OVERRIDE_HEADER, PING_PATH};
use crate::health::NetworkHint;
use crate::resolve::ResolutionCache;

use super::attempt::{AttemptExecutor, RequestOptions};
use super::error::{AttemptError, AttemptRecord, ExhaustedError, FailureDiagnosis};

/// Retry budget and backoff shape for the catalog walk
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of full-catalog retry rounds after the first pass
    pub max_retries: u32,

    /// Base delay in milliseconds; round `n` waits `2^n * base`
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before the given retry round (1-based)
    pub fn delay_for_round(&self, round: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << round.min(16)))
    }
}

/// A logical API request, independent of which concrete endpoint serves it
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Canonical path suffix, e.g. `/api/chat`
    pub path: String,
    pub headers: reqwest::header::HeaderMap,
    pub body: Option<Bytes>,
}

impl ApiRequest {
    /// A GET against a canonical path
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            headers: reqwest::header::HeaderMap::new(),
            body: None,
        }
    }

    /// A JSON POST against a canonical path
    pub fn post_json<T: Serialize>(
        path: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(payload)?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            method: Method::POST,
            path: path.into(),
            headers,
            body: Some(Bytes::from(body)),
        })
    }
}

/// Walks the endpoint catalog and retry schedule to produce one successful
/// response or an aggregated failure
pub struct Orchestrator {
    executor: AttemptExecutor,
    catalog: EndpointCatalog,
    cache: Arc<ResolutionCache>,
    policy: RetryPolicy,
}

impl Orchestrator {
    /// Create an orchestrator over the given catalog and cache
    pub fn new(
        catalog: EndpointCatalog,
        cache: Arc<ResolutionCache>,
        attempt_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().gzip(true).build()?;

        Ok(Self {
            executor: AttemptExecutor::new(client, cache.clone(), attempt_timeout),
            catalog,
            cache,
            policy: RetryPolicy::default(),
        })
    }

    /// Override the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The catalog this orchestrator walks
    pub fn catalog(&self) -> &EndpointCatalog {
        &self.catalog
    }

    /// Execute a request, trying every endpoint and retry round until one
    /// succeeds
    ///
    /// Caller-supplied headers and body are preserved verbatim on the first
    /// pass and on cached-IP shortcuts; retry rounds use a reduced
    /// standardized header set with keep-alive semantics.
    pub async fn execute(&self, request: &ApiRequest) -> Result<Response, ExhaustedError> {
        self.execute_with_hint(request, NetworkHint::Unknown).await
    }

    /// Execute a request, honoring a caller-supplied network signal
    ///
    /// The walk itself is unchanged; a [`NetworkHint::Offline`] signal is
    /// authoritative for the terminal diagnosis, so callers can tell a local
    /// outage apart from unreachable servers.
    pub async fn execute_with_hint(
        &self,
        request: &ApiRequest,
        hint: NetworkHint,
    ) -> Result<Response, ExhaustedError> {
        let mut records: Vec<AttemptRecord> = Vec::new();

        for round in 0..=self.policy.max_retries {
            if round > 0 {
                let delay = self.policy.delay_for_round(round);
                tracing::debug!(
                    round,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before retry round"
                );
                tokio::time::sleep(delay).await;
            }

            let options = if round == 0 {
                RequestOptions {
                    method: request.method.clone(),
                    headers: request.headers.clone(),
                    body: request.body.clone(),
                }
            } else {
                standardized_options(request)
            };

            if let Some(response) = self
                .walk_catalog(request, &options, round, &mut records)
                .await
            {
                return Ok(response);
            }
        }

        let error = if hint == NetworkHint::Offline {
            ExhaustedError::with_diagnosis(records, FailureDiagnosis::NetworkOffline)
        } else {
            ExhaustedError::new(records)
        };
        tracing::error!(
            attempts = error.attempts.len(),
            diagnosis = ?error.diagnosis,
            "Every endpoint and retry round exhausted"
        );
        Err(error)
    }

    /// GET the canonical ping path through the fallback machinery
    pub async fn ping(&self) -> Result<Response, ExhaustedError> {
        self.execute(&ApiRequest::get(PING_PATH)).await
    }

    /// POST a JSON payload to the canonical chat/data path
    pub async fn post_chat<T: Serialize>(&self, payload: &T) -> crate::error::Result<Response> {
        let request = ApiRequest::post_json(CHAT_PATH, payload)?;
        Ok(self.execute(&request).await?)
    }

    // One full pass over the catalog. Returns the first successful response,
    // appending a record for every failure encountered.
    async fn walk_catalog(
        &self,
        request: &ApiRequest,
        options: &RequestOptions,
        round: u32,
        records: &mut Vec<AttemptRecord>,
    ) -> Option<Response> {
        for endpoint in self.catalog.endpoints() {
            let url = endpoint.url_for(&request.path);

            // Cached-IP shortcut: connect by remembered IP, asking the origin
            // for the endpoint's own virtual host. A failure invalidates the
            // entry and falls through to the endpoint's own URL.
            if let Some(host) = endpoint.cache_host() {
                let host = host.to_string();
                if let Some(ip) = self.cache.get(&host).await {
                    if let Some(shortcut_url) = rewrite_url_host(&url, &ip) {
                        let label = shortcut_label(endpoint, &ip, round);
                        let mut opts = options.clone();
                        insert_host_override(&mut opts.headers, &host);

                        let started = Instant::now();
                        match self
                            .executor
                            .attempt(&shortcut_url, &opts, &label, Some(&host))
                            .await
                        {
                            Ok(response) => return Some(response),
                            Err(error) => {
                                records.push(make_record(
                                    endpoint,
                                    &shortcut_url,
                                    label,
                                    &error,
                                    started.elapsed(),
                                ));
                                self.cache.remove(&host).await;
                            }
                        }
                    }
                }
            }

            let label = attempt_label(endpoint, round);
            let mut opts = options.clone();
            if let Some(virtual_host) = endpoint.host_override() {
                insert_host_override(&mut opts.headers, virtual_host);
            }

            // A raw-IP success is worth remembering under its virtual host.
            let cacheable = if endpoint.kind() == EndpointKind::RawIp {
                endpoint.host_override()
            } else {
                None
            };

            let started = Instant::now();
            match self.executor.attempt(&url, &opts, &label, cacheable).await {
                Ok(response) => {
                    tracing::info!(label = %label, url = %url, round, "Request served");
                    return Some(response);
                }
                Err(error) => {
                    records.push(make_record(endpoint, &url, label, &error, started.elapsed()));
                }
            }
        }

        None
    }
}

// Reduced header set for retried requests: JSON accept, the caller's
// content type if one was set, and keep-alive semantics.
fn standardized_options(request: &ApiRequest) -> RequestOptions {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(content_type) = request.headers.get(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, content_type.clone());
    }
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    RequestOptions {
        method: request.method.clone(),
        headers,
        body: request.body.clone(),
    }
}

fn insert_host_override(headers: &mut reqwest::header::HeaderMap, host: &str) {
    if let Ok(value) = HeaderValue::from_str(host) {
        headers.insert(HOST_OVERRIDE_HEADER, value);
    }
}

/// Swap the host of a URL for an IP literal, keeping port and path
///
/// Certificate validation against an IP literal cannot succeed, so https
/// shortcuts downgrade to http, same as the raw-IP catalog entries.
fn rewrite_url_host(url: &Url, ip: &str) -> Option<Url> {
    let mut rewritten = url.clone();
    let host = if ip.contains(':') {
        format!("[{ip}]")
    } else {
        ip.to_string()
    };
    rewritten.set_host(Some(&host)).ok()?;
    if rewritten.scheme() == "https" {
        rewritten.set_scheme("http").ok()?;
    }
    Some(rewritten)
}

fn attempt_label(endpoint: &Endpoint, round: u32) -> String {
    if round == 0 {
        endpoint.label().to_string()
    } else {
        format!("{} (retry round {round})", endpoint.label())
    }
}

fn shortcut_label(endpoint: &Endpoint, ip: &str, round: u32) -> String {
    if round == 0 {
        format!("{} via cached IP {ip}", endpoint.label())
    } else {
        format!("{} via cached IP {ip} (retry round {round})", endpoint.label())
    }
}

fn make_record(
    endpoint: &Endpoint,
    url: &Url,
    label: String,
    error: &AttemptError,
    elapsed: Duration,
) -> AttemptRecord {
    AttemptRecord {
        endpoint_kind: endpoint.kind(),
        url: url.to_string(),
        label,
        kind: error.kind(),
        status: error.status(),
        error: error.to_string(),
        elapsed_ms: elapsed.as_millis() as u64,
    }
}
