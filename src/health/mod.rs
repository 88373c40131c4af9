//! Health prober: independent reachability classifier for the API
//!
//! The prober answers "can we reach the API right now, and through which
//! route?" for a status indicator. It is invoked on demand, computes a fresh
//! report every time, and never caches.
//!
//! Two modes:
//! - **Local/dev**: one bounded probe of the local proxy ping URL.
//! - **Production**: a sweep of third-party connectivity probes (internet
//!   signal only), a primary API ping, a fallback ping if the primary fails,
//!   and a last-resort direct-IP probe when the failure pattern points at
//!   DNS.

use reqwest::header::HeaderValue;
use reqwest::Client;
use serde::Serialize;
use std::time::{Duration, Instant};
use url::Url;

use crate::client::error::AttemptError;
use crate::config::ProbeConfig;
use crate::endpoint::{Endpoint, EndpointCatalog, EndpointKind, HOST_OVERRIDE_HEADER, PING_PATH};

/// Overall API reachability classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    /// Primary domain is serving
    Online,
    /// A non-primary route (fallback domain or direct IP) is serving
    Fallback,
    /// No route works
    Offline,
    /// No probe has run
    Unknown,
}

impl ApiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiStatus::Online => "online",
            ApiStatus::Fallback => "fallback",
            ApiStatus::Offline => "offline",
            ApiStatus::Unknown => "unknown",
        }
    }
}

/// Caller-supplied network signal, the generalization of the browser's
/// offline flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkHint {
    /// Platform says the network is up
    Online,
    /// Platform says the network is down
    Offline,
    /// No platform signal available
    #[default]
    Unknown,
}

/// Result of one probe sweep; computed fresh on every call
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: ApiStatus,
    pub primary_available: bool,
    pub fallback_available: bool,
    pub latency_ms: u64,
    pub message: String,
    pub timestamp: String,
}

impl HealthReport {
    fn new(
        status: ApiStatus,
        primary_available: bool,
        fallback_available: bool,
        latency_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            primary_available,
            fallback_available,
            latency_ms,
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Runs reachability probes and classifies overall API health
pub struct HealthProber {
    client: Client,
    catalog: EndpointCatalog,
    config: ProbeConfig,
}

impl HealthProber {
    /// Create a prober over the given catalog
    pub fn new(catalog: EndpointCatalog, config: ProbeConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().gzip(true).build()?;
        Ok(Self {
            client,
            catalog,
            config,
        })
    }

    /// Probe with no platform network signal
    pub async fn probe(&self) -> HealthReport {
        self.probe_with_hint(NetworkHint::Unknown).await
    }

    /// Probe, honoring a caller-supplied network signal
    pub async fn probe_with_hint(&self, hint: NetworkHint) -> HealthReport {
        if self.config.local_mode {
            return self.probe_local().await;
        }
        self.probe_production(hint).await
    }

    // Local/dev mode: one bounded probe of the local proxy, no fallback or
    // IP logic.
    async fn probe_local(&self) -> HealthReport {
        let timeout = Duration::from_millis(self.config.probe_timeout_ms);
        match self
            .probe_url(&self.config.local_ping_url, timeout, None)
            .await
        {
            Ok(latency_ms) => HealthReport::new(
                ApiStatus::Online,
                true,
                false,
                latency_ms,
                "Local proxy is reachable",
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Local proxy probe failed");
                HealthReport::new(
                    ApiStatus::Offline,
                    false,
                    false,
                    0,
                    format!("Local proxy is unreachable: {e}"),
                )
            }
        }
    }

    async fn probe_production(&self, hint: NetworkHint) -> HealthReport {
        let started = Instant::now();

        // The platform signal is authoritative for "down": nothing to probe.
        if hint == NetworkHint::Offline {
            return HealthReport::new(
                ApiStatus::Offline,
                false,
                false,
                0,
                "Network reported offline",
            );
        }

        let connectivity_up = self.general_connectivity_up().await;
        let mut dns_suspected = false;

        // Primary first; its success ends the sweep.
        if let Some(primary) = self.catalog.first_of(EndpointKind::Primary) {
            match self.probe_endpoint(primary).await {
                Ok(latency_ms) => {
                    return HealthReport::new(
                        ApiStatus::Online,
                        true,
                        false,
                        latency_ms,
                        "Primary API is reachable",
                    );
                }
                Err(e) => {
                    dns_suspected |= e.is_dns_shaped();
                    tracing::warn!(error = %e, "Primary API probe failed");
                }
            }
        }

        // Fallback domain only once the primary has failed.
        if let Some(fallback) = self.catalog.first_of(EndpointKind::Fallback) {
            match self.probe_endpoint(fallback).await {
                Ok(latency_ms) => {
                    return HealthReport::new(
                        ApiStatus::Fallback,
                        false,
                        true,
                        latency_ms,
                        "Primary unreachable; fallback domain is serving",
                    );
                }
                Err(e) => {
                    dns_suspected |= e.is_dns_shaped();
                    tracing::warn!(error = %e, "Fallback API probe failed");
                }
            }
        }

        // Last resort: direct IP, but only when the failure pattern points at
        // DNS while general connectivity is intact.
        if connectivity_up && dns_suspected {
            for endpoint in self.catalog.raw_ip_endpoints() {
                if let Ok(latency_ms) = self.probe_endpoint(endpoint).await {
                    let ip = endpoint.base().host_str().unwrap_or("unknown").to_string();
                    let virtual_host = endpoint.host_override().unwrap_or("unknown");
                    return HealthReport::new(
                        ApiStatus::Fallback,
                        false,
                        false,
                        latency_ms,
                        format!("API reachable via direct IP {ip} for {virtual_host}"),
                    );
                }
            }
        }

        let message = if !connectivity_up {
            "General internet connectivity appears down"
        } else if dns_suspected {
            "DNS resolution failure suspected for API domains"
        } else {
            "API unreachable for an unknown reason"
        };

        HealthReport::new(
            ApiStatus::Offline,
            false,
            false,
            started.elapsed().as_millis() as u64,
            message,
        )
    }

    // Sweep the third-party probes; any single success is enough of an
    // internet signal.
    async fn general_connectivity_up(&self) -> bool {
        let timeout = Duration::from_millis(self.config.probe_timeout_ms);
        for url in &self.config.connectivity_urls {
            if self.probe_url(url, timeout, None).await.is_ok() {
                tracing::debug!(url = %url, "General connectivity confirmed");
                return true;
            }
        }
        tracing::warn!("No connectivity probe succeeded");
        false
    }

    async fn probe_endpoint(&self, endpoint: &Endpoint) -> Result<u64, AttemptError> {
        let url = endpoint.url_for(PING_PATH);
        let timeout = Duration::from_millis(self.config.api_timeout_ms);
        self.probe_url(url.as_str(), timeout, endpoint.host_override())
            .await
    }

    // One bounded GET; healthy iff the response's ok flag is true. Body
    // content is ignored.
    async fn probe_url(
        &self,
        url: &str,
        timeout: Duration,
        host_override: Option<&str>,
    ) -> Result<u64, AttemptError> {
        let parsed =
            Url::parse(url).map_err(|e| AttemptError::Network(format!("invalid probe URL: {e}")))?;

        let mut request = self.client.get(parsed);
        if let Some(host) = host_override {
            if let Ok(value) = HeaderValue::from_str(host) {
                request = request.header(HOST_OVERRIDE_HEADER, value);
            }
        }

        let started = Instant::now();
        match tokio::time::timeout(timeout, request.send()).await {
            Err(_) => Err(AttemptError::Timeout(timeout.as_millis() as u64)),
            Ok(Err(e)) => Err(AttemptError::from_reqwest(
                &e,
                timeout.as_millis() as u64,
            )),
            Ok(Ok(response)) if response.status().is_success() => {
                Ok(started.elapsed().as_millis() as u64)
            }
            Ok(Ok(response)) => Err(AttemptError::HttpStatus(response.status().as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_status_as_str() {
        assert_eq!(ApiStatus::Online.as_str(), "online");
        assert_eq!(ApiStatus::Fallback.as_str(), "fallback");
        assert_eq!(ApiStatus::Offline.as_str(), "offline");
        assert_eq!(ApiStatus::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_network_hint_default_is_unknown() {
        assert_eq!(NetworkHint::default(), NetworkHint::Unknown);
    }

    #[test]
    fn test_health_report_serialization() {
        let report = HealthReport::new(ApiStatus::Online, true, false, 42, "Primary API is reachable");
        let json = serde_json::to_string(&report).unwrap();

        assert!(json.contains("\"status\":\"online\""));
        assert!(json.contains("\"primary_available\":true"));
        assert!(json.contains("\"latency_ms\":42"));
    }
}
