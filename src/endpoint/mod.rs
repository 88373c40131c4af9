//! Endpoint catalog: the fixed priority order of addresses for the API
//!
//! One logical API is reachable through several concrete addresses, tried in
//! a deliberate trust/preference order:
//!
//! 1. Configured primary domain
//! 2. Configured fallback domain
//! 3. Two hard-coded mirror domains (defense against misconfigured input)
//! 4. Two raw-IP targets (defense against total DNS failure)
//!
//! Raw-IP targets are paired with the virtual-host name the origin expects,
//! supplied via the host-override header since the connection is made by IP
//! but must still route to the correct virtual host.

use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Header instructing the origin which virtual host to serve when the
/// connection was made by raw IP
pub const HOST_OVERRIDE_HEADER: &str = "x-target-host";

/// Canonical ping probe path; treated healthy iff the response ok flag is true
pub const PING_PATH: &str = "/ping";

/// Canonical chat/data endpoint path
pub const CHAT_PATH: &str = "/api/chat";

/// Hard-coded mirror domains, tried after the configured bases
pub const MIRROR_BASES: [&str; 2] = [
    "https://api.caremesh.net",
    "https://api-mirror.caremesh.org",
];

/// Hard-coded raw-IP targets paired with the virtual host they impersonate
pub const RAW_IP_TARGETS: [(&str, &str); 2] = [
    ("203.0.113.17", "api.caremesh.io"),
    ("198.51.100.34", "api-fallback.caremesh.io"),
];

/// Catalog construction errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Base URL could not be parsed
    #[error("Invalid base URL: {0}")]
    InvalidBase(String),

    /// Base URL uses a scheme other than http/https
    #[error("Unsupported scheme '{scheme}' in base URL {url}")]
    UnsupportedScheme { scheme: String, url: String },

    /// Base URL has no host component
    #[error("Base URL has no host: {0}")]
    MissingHost(String),
}

/// Position of an endpoint in the trust order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Primary,
    Fallback,
    Mirror,
    RawIp,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Primary => "primary",
            EndpointKind::Fallback => "fallback",
            EndpointKind::Mirror => "mirror",
            EndpointKind::RawIp => "raw-ip",
        }
    }
}

/// One concrete address worth trying for a logical API call
#[derive(Debug, Clone)]
pub struct Endpoint {
    kind: EndpointKind,
    base: Url,
    label: String,
    host_override: Option<String>,
}

impl Endpoint {
    /// Create a domain-based endpoint from an already-normalized base
    fn domain(kind: EndpointKind, base: Url, label: impl Into<String>) -> Self {
        Self {
            kind,
            base,
            label: label.into(),
            host_override: None,
        }
    }

    /// Create a raw-IP endpoint carrying the virtual host it impersonates
    fn raw_ip(base: Url, virtual_host: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: EndpointKind::RawIp,
            base,
            label: label.into(),
            host_override: Some(virtual_host.into()),
        }
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Human-readable attempt label used in diagnostics
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Normalized base URL
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Whether the endpoint connects by domain name (and thus benefits from
    /// the resolution cache)
    pub fn is_domain_based(&self) -> bool {
        !matches!(self.kind, EndpointKind::RawIp)
    }

    /// Hostname used as the resolution-cache key, for domain-based endpoints
    pub fn cache_host(&self) -> Option<&str> {
        if self.is_domain_based() {
            self.base.host_str()
        } else {
            None
        }
    }

    /// Virtual host to place in the host-override header; set exactly for
    /// raw-IP endpoints
    pub fn host_override(&self) -> Option<&str> {
        self.host_override.as_deref()
    }

    /// Full URL for a canonical path suffix
    pub fn url_for(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url
    }
}

/// Normalize a base URL so every catalog entry resolves the same logical
/// resource path regardless of what was configured
///
/// Strips any path, query, and fragment, keeping only scheme, host, and port.
/// Applied identically to runtime-configured bases, bundled bases, and raw IP
/// literals.
pub fn normalize_base(raw: &str) -> Result<Url, CatalogError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|_| CatalogError::InvalidBase(raw.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(CatalogError::UnsupportedScheme {
                scheme: other.to_string(),
                url: raw.to_string(),
            })
        }
    }

    if url.host_str().is_none() {
        return Err(CatalogError::MissingHost(raw.to_string()));
    }

    url.set_path("");
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Static, ordered list of every address worth trying
///
/// The catalog order is fixed and is the priority order of attempts.
#[derive(Debug, Clone)]
pub struct EndpointCatalog {
    endpoints: Vec<Endpoint>,
}

impl EndpointCatalog {
    /// Build the standard six-entry catalog from configured primary and
    /// fallback bases plus the bundled mirrors and raw-IP targets
    pub fn new(primary_base: &str, fallback_base: &str) -> Result<Self, CatalogError> {
        let mut endpoints = Vec::with_capacity(6);

        endpoints.push(Endpoint::domain(
            EndpointKind::Primary,
            normalize_base(primary_base)?,
            "primary domain",
        ));
        endpoints.push(Endpoint::domain(
            EndpointKind::Fallback,
            normalize_base(fallback_base)?,
            "fallback domain",
        ));

        for (i, base) in MIRROR_BASES.iter().enumerate() {
            endpoints.push(Endpoint::domain(
                EndpointKind::Mirror,
                normalize_base(base)?,
                format!("mirror domain {}", i + 1),
            ));
        }

        for (ip, virtual_host) in RAW_IP_TARGETS {
            // Raw-IP targets use http: certificate validation against an IP
            // literal cannot succeed, and TLS handling is out of scope.
            endpoints.push(Endpoint::raw_ip(
                normalize_base(&format!("http://{ip}"))?,
                virtual_host,
                format!("direct IP {ip}"),
            ));
        }

        Ok(Self { endpoints })
    }

    /// Build a catalog from explicit endpoints (tests and local setups)
    pub fn from_endpoints(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    /// Build a single domain-based endpoint entry for custom catalogs
    pub fn domain_endpoint(
        kind: EndpointKind,
        base: &str,
        label: impl Into<String>,
    ) -> Result<Endpoint, CatalogError> {
        Ok(Endpoint::domain(kind, normalize_base(base)?, label))
    }

    /// Build a single raw-IP endpoint entry for custom catalogs
    pub fn raw_ip_endpoint(
        base: &str,
        virtual_host: impl Into<String>,
        label: impl Into<String>,
    ) -> Result<Endpoint, CatalogError> {
        Ok(Endpoint::raw_ip(normalize_base(base)?, virtual_host, label))
    }

    /// Endpoints in priority order
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// The raw-IP last-resort targets, in catalog order
    pub fn raw_ip_endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints
            .iter()
            .filter(|e| e.kind == EndpointKind::RawIp)
    }

    /// First endpoint of the given kind
    pub fn first_of(&self, kind: EndpointKind) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_strips_path_and_query() {
        let url = normalize_base("https://api.caremesh.io/api/chat?x=1#frag").unwrap();
        assert_eq!(url.as_str(), "https://api.caremesh.io/");

        let url = normalize_base("https://api.caremesh.io///").unwrap();
        assert_eq!(url.as_str(), "https://api.caremesh.io/");
    }

    #[test]
    fn test_normalize_base_keeps_port() {
        let url = normalize_base("http://127.0.0.1:8787/some/path").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8787/");
    }

    #[test]
    fn test_normalize_base_rejects_bad_input() {
        assert!(matches!(
            normalize_base("not a url"),
            Err(CatalogError::InvalidBase(_))
        ));
        assert!(matches!(
            normalize_base("ftp://api.caremesh.io"),
            Err(CatalogError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_catalog_order_and_shape() {
        let catalog =
            EndpointCatalog::new("https://api.caremesh.io", "https://api-fallback.caremesh.io")
                .unwrap();

        assert_eq!(catalog.len(), 6);

        let kinds: Vec<_> = catalog.endpoints().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                EndpointKind::Primary,
                EndpointKind::Fallback,
                EndpointKind::Mirror,
                EndpointKind::Mirror,
                EndpointKind::RawIp,
                EndpointKind::RawIp,
            ]
        );

        // Exactly the raw-IP descriptors carry a host override
        for e in catalog.endpoints() {
            assert_eq!(e.host_override().is_some(), !e.is_domain_based());
        }
    }

    #[test]
    fn test_configured_base_with_path_matches_bundled_shape() {
        // A base configured with a stray path must resolve to the same
        // canonical URL as a clean one.
        let a = EndpointCatalog::new(
            "https://api.caremesh.io/api/chat/",
            "https://api-fallback.caremesh.io",
        )
        .unwrap();
        let b =
            EndpointCatalog::new("https://api.caremesh.io", "https://api-fallback.caremesh.io")
                .unwrap();

        assert_eq!(
            a.endpoints()[0].url_for(CHAT_PATH),
            b.endpoints()[0].url_for(CHAT_PATH)
        );
    }

    #[test]
    fn test_url_for_joins_canonical_path() {
        let catalog =
            EndpointCatalog::new("https://api.caremesh.io", "https://api-fallback.caremesh.io")
                .unwrap();

        let primary = &catalog.endpoints()[0];
        assert_eq!(
            primary.url_for(PING_PATH).as_str(),
            "https://api.caremesh.io/ping"
        );
        assert_eq!(
            primary.url_for(CHAT_PATH).as_str(),
            "https://api.caremesh.io/api/chat"
        );
    }

    #[test]
    fn test_cache_host_only_for_domain_based() {
        let catalog =
            EndpointCatalog::new("https://api.caremesh.io", "https://api-fallback.caremesh.io")
                .unwrap();

        assert_eq!(catalog.endpoints()[0].cache_host(), Some("api.caremesh.io"));
        assert_eq!(catalog.endpoints()[4].cache_host(), None);
    }

    #[test]
    fn test_raw_ip_targets_pair_with_virtual_hosts() {
        let catalog =
            EndpointCatalog::new("https://api.caremesh.io", "https://api-fallback.caremesh.io")
                .unwrap();

        let raw: Vec<_> = catalog.raw_ip_endpoints().collect();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].host_override(), Some("api.caremesh.io"));
        assert_eq!(raw[1].host_override(), Some("api-fallback.caremesh.io"));
    }
}
