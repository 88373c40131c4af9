//! Client-side resolution cache mapping hostnames to known-good IP addresses
//!
//! The cache remembers IP addresses discovered opportunistically from
//! successful direct-IP connections; it performs no DNS lookups itself.
//! Entries expire after a TTL and are purged lazily during lookup, so the
//! cache self-heals once the underlying DNS infrastructure recovers.
//!
//! Persistence is best-effort: every mutation writes the full map to the
//! configured [`CacheStore`], a corrupt or absent snapshot yields an empty
//! cache, and storage failures are logged and swallowed.
//!
//! # Example
//!
//! ```rust,ignore
//! use lifeline::resolve::{ResolutionCache, FileStore, SystemClock};
//!
//! let cache = ResolutionCache::new(Box::new(FileStore::new("cache.json")), Box::new(SystemClock));
//! cache.set("api.caremesh.io", "203.0.113.17").await;
//! let ip = cache.get("api.caremesh.io").await;
//! ```

pub mod clock;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{CacheStore, FileStore, MemoryStore};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use tokio::sync::RwLock;

/// Default entry lifetime: long enough to ride out a DNS outage within a
/// session, short enough to recover once the infrastructure heals
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;

/// One persisted hostname→IP mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Remembered IP address
    pub ip_address: String,

    /// When the mapping was recorded (epoch ms)
    pub recorded_at: i64,

    /// Lifetime of the mapping in milliseconds
    pub ttl_ms: u64,
}

impl CacheEntry {
    /// Check whether the entry has outlived its TTL at the given instant
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.recorded_at.saturating_add(self.ttl_ms as i64)
    }
}

/// Hostname→IP cache with per-entry expiry and durable snapshots
///
/// The cache is shared by concurrent orchestrator calls; writes are
/// last-write-wins. Entries are advisory hints, not correctness-critical
/// state, so a lost write only costs one extra failed round-trip.
pub struct ResolutionCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    store: Box<dyn CacheStore>,
    clock: Box<dyn Clock>,
    default_ttl_ms: u64,
}

impl ResolutionCache {
    /// Create a cache, reloading any snapshot held by the store
    pub fn new(store: Box<dyn CacheStore>, clock: Box<dyn Clock>) -> Self {
        let entries = match store.load() {
            Some(snapshot) => match serde_json::from_str::<HashMap<String, CacheEntry>>(&snapshot)
            {
                Ok(map) => {
                    tracing::debug!(entries = map.len(), "Loaded resolution cache snapshot");
                    map
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Corrupt resolution cache snapshot, starting empty");
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };

        Self {
            entries: RwLock::new(entries),
            store,
            clock,
            default_ttl_ms: DEFAULT_TTL_MS,
        }
    }

    /// Override the default TTL applied by [`set`](Self::set)
    pub fn with_default_ttl(mut self, ttl_ms: u64) -> Self {
        self.default_ttl_ms = ttl_ms;
        self
    }

    /// Look up the cached IP for a hostname
    ///
    /// Expired entries are purged as a side effect before answering, so
    /// repeated calls self-heal without an external sweeper.
    pub async fn get(&self, hostname: &str) -> Option<String> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        if entries.len() != before {
            tracing::debug!(
                purged = before - entries.len(),
                "Purged expired resolution cache entries"
            );
            self.persist(&entries);
        }

        entries.get(hostname).map(|e| e.ip_address.clone())
    }

    /// Remember an IP for a hostname using the default TTL
    pub async fn set(&self, hostname: &str, ip_address: &str) {
        self.set_with_ttl(hostname, ip_address, self.default_ttl_ms)
            .await;
    }

    /// Remember an IP for a hostname with an explicit TTL
    ///
    /// A syntactically invalid IP is rejected as a logged no-op rather than a
    /// hard error, so malformed data extracted from a URL can never poison
    /// the cache. An existing entry for the hostname is overwritten and its
    /// timestamp reset.
    pub async fn set_with_ttl(&self, hostname: &str, ip_address: &str, ttl_ms: u64) {
        if !is_valid_ip(ip_address) {
            tracing::warn!(
                hostname = %hostname,
                ip = %ip_address,
                "Rejected invalid IP address for resolution cache"
            );
            return;
        }

        let entry = CacheEntry {
            ip_address: ip_address.to_string(),
            recorded_at: self.clock.now_ms(),
            ttl_ms,
        };

        let mut entries = self.entries.write().await;
        entries.insert(hostname.to_string(), entry);
        tracing::debug!(hostname = %hostname, ip = %ip_address, "Cached resolved IP");
        self.persist(&entries);
    }

    /// Drop the entry for a hostname
    ///
    /// Called by the orchestrator when a cached-IP shortcut attempt fails, so
    /// a known-stale address is never tried again.
    pub async fn remove(&self, hostname: &str) {
        let mut entries = self.entries.write().await;
        if entries.remove(hostname).is_some() {
            tracing::debug!(hostname = %hostname, "Invalidated resolution cache entry");
            self.persist(&entries);
        }
    }

    /// Drop every entry
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.persist(&entries);
    }

    /// Copy of the current (possibly stale) map for diagnostics
    pub async fn snapshot(&self) -> HashMap<String, CacheEntry> {
        self.entries.read().await.clone()
    }

    /// Number of entries, counting not-yet-purged expired ones
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    // Persist the full map; failures are logged and swallowed because cache
    // correctness is best-effort, not transactional.
    fn persist(&self, entries: &HashMap<String, CacheEntry>) {
        let snapshot = match serde_json::to_string(entries) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize resolution cache");
                return;
            }
        };

        if let Err(e) = self.store.save(&snapshot) {
            tracing::warn!(error = %e, "Failed to persist resolution cache");
        }
    }
}

/// Validate an IP address token: IPv4 dotted-quad, or a loose IPv6 shape
/// (hex digits, colons, and dots for v4-mapped forms)
pub fn is_valid_ip(candidate: &str) -> bool {
    if candidate.parse::<Ipv4Addr>().is_ok() {
        return true;
    }

    candidate.len() >= 2
        && candidate.contains(':')
        && candidate
            .chars()
            .all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cache(start_ms: i64) -> ResolutionCache {
        ResolutionCache::new(
            Box::new(MemoryStore::new()),
            Box::new(ManualClock::new(start_ms)),
        )
    }

    #[test]
    fn test_is_valid_ip() {
        assert!(is_valid_ip("203.0.113.17"));
        assert!(is_valid_ip("10.0.0.1"));
        assert!(is_valid_ip("2606:4700::6810:84e5"));
        assert!(is_valid_ip("::1"));
        assert!(is_valid_ip("::ffff:192.0.2.1"));

        assert!(!is_valid_ip("not-an-ip"));
        assert!(!is_valid_ip(""));
        assert!(!is_valid_ip("256.1.2.3"));
        assert!(!is_valid_ip("api.caremesh.io"));
        assert!(!is_valid_ip("203.0.113"));
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = test_cache(1_000);

        cache.set("api.caremesh.io", "203.0.113.17").await;
        assert_eq!(
            cache.get("api.caremesh.io").await.as_deref(),
            Some("203.0.113.17")
        );
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let clock = std::sync::Arc::new(ManualClock::new(0));

        struct SharedClock(std::sync::Arc<ManualClock>);
        impl Clock for SharedClock {
            fn now_ms(&self) -> i64 {
                self.0.now_ms()
            }
        }

        let cache = ResolutionCache::new(
            Box::new(MemoryStore::new()),
            Box::new(SharedClock(clock.clone())),
        );

        cache
            .set_with_ttl("api.caremesh.io", "203.0.113.17", 1_000)
            .await;
        assert!(cache.get("api.caremesh.io").await.is_some());

        clock.advance(999);
        assert!(cache.get("api.caremesh.io").await.is_some());

        clock.advance(2);
        assert!(cache.get("api.caremesh.io").await.is_none());

        // Lazy purge removed the entry entirely
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_ip_is_rejected() {
        let cache = test_cache(0);

        cache.set("api.caremesh.io", "not-an-ip").await;
        assert!(cache.get("api.caremesh.io").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_overwrites_and_resets_timestamp() {
        let cache = test_cache(0);

        cache.set("api.caremesh.io", "203.0.113.17").await;
        cache.set("api.caremesh.io", "198.51.100.34").await;

        assert_eq!(
            cache.get("api.caremesh.io").await.as_deref(),
            Some("198.51.100.34")
        );
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let cache = test_cache(0);

        cache.set("a.example", "203.0.113.1").await;
        cache.set("b.example", "203.0.113.2").await;

        cache.remove("a.example").await;
        assert!(cache.get("a.example").await.is_none());
        assert!(cache.get("b.example").await.is_some());

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_yields_empty_cache() {
        let cache = ResolutionCache::new(
            Box::new(MemoryStore::with_snapshot("{{{ not json")),
            Box::new(ManualClock::new(0)),
        );

        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        {
            let cache = ResolutionCache::new(
                Box::new(FileStore::new(&path)),
                Box::new(ManualClock::new(500)),
            );
            cache.set("api.caremesh.io", "203.0.113.17").await;
        }

        // Simulated reload at the same instant
        let reloaded = ResolutionCache::new(
            Box::new(FileStore::new(&path)),
            Box::new(ManualClock::new(600)),
        );
        assert_eq!(
            reloaded.get("api.caremesh.io").await.as_deref(),
            Some("203.0.113.17")
        );
    }

    #[tokio::test]
    async fn test_storage_failure_is_swallowed() {
        struct FailingStore;
        impl CacheStore for FailingStore {
            fn load(&self) -> Option<String> {
                None
            }
            fn save(&self, _snapshot: &str) -> std::io::Result<()> {
                Err(std::io::Error::other("disk full"))
            }
        }

        let cache = ResolutionCache::new(Box::new(FailingStore), Box::new(ManualClock::new(0)));

        // Mutations still succeed in memory
        cache.set("api.caremesh.io", "203.0.113.17").await;
        assert!(cache.get("api.caremesh.io").await.is_some());
    }
}
