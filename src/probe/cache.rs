//! In-process probe result cache.
//!
//! Entries are keyed by `(host, kind)` and expire after the TTL given at
//! insertion. Expired entries are treated as misses and replaced by the next
//! `put`; nothing sweeps them. Time is read through `tokio::time`, so tests
//! running with a paused clock can advance past a TTL.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use tokio::time::Instant;

use super::types::{ProbeKind, ProbeResult};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: ProbeResult,
    expires_at: Instant,
}

/// Process-lifetime cache of probe results.
///
/// Safe to share across tasks behind an `Arc`. Concurrent writers to the same
/// key race; the last write wins.
#[derive(Debug, Default)]
pub struct ProbeCache {
    entries: RwLock<HashMap<(String, ProbeKind), CacheEntry>>,
}

impl ProbeCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result for `(host, kind)` if present and not expired.
    pub fn get(&self, host: &str, kind: ProbeKind) -> Option<ProbeResult> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(&(host.to_string(), kind))?;
        if Instant::now() < entry.expires_at {
            Some(entry.value.clone())
        } else {
            log::debug!("Probe cache entry expired: {host} {kind}");
            None
        }
    }

    /// Stores `result` for `(host, kind)` until `ttl` elapses.
    pub fn put(&self, host: &str, kind: ProbeKind, result: ProbeResult, ttl: Duration) {
        let entry = CacheEntry {
            value: result,
            expires_at: Instant::now() + ttl,
        };
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((host.to_string(), kind), entry);
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn result(kind: ProbeKind, marker: u64) -> ProbeResult {
        ProbeResult::new(kind, json!({ "marker": marker }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_before_ttl_miss_after() {
        let cache = ProbeCache::new();
        cache.put(
            "example.com",
            ProbeKind::Dns,
            result(ProbeKind::Dns, 1),
            Duration::from_secs(60),
        );

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("example.com", ProbeKind::Dns).is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("example.com", ProbeKind::Dns).is_none());
        // Lazily invalidated: still stored until overwritten.
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_overwritten() {
        let cache = ProbeCache::new();
        let ttl = ProbeKind::HttpHeaders.ttl();
        cache.put("a.test", ProbeKind::HttpHeaders, result(ProbeKind::HttpHeaders, 1), ttl);
        tokio::time::advance(ttl).await;
        cache.put("a.test", ProbeKind::HttpHeaders, result(ProbeKind::HttpHeaders, 2), ttl);

        let hit = cache.get("a.test", ProbeKind::HttpHeaders).unwrap();
        assert_eq!(hit.payload["marker"], 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_host_and_kind() {
        let cache = ProbeCache::new();
        let ttl = Duration::from_secs(3600);
        cache.put("a.test", ProbeKind::Dns, result(ProbeKind::Dns, 1), ttl);
        cache.put("b.test", ProbeKind::Dns, result(ProbeKind::Dns, 2), ttl);
        cache.put("a.test", ProbeKind::Geo, result(ProbeKind::Geo, 3), ttl);

        assert_eq!(cache.get("a.test", ProbeKind::Dns).unwrap().payload["marker"], 1);
        assert_eq!(cache.get("b.test", ProbeKind::Dns).unwrap().payload["marker"], 2);
        assert_eq!(cache.get("a.test", ProbeKind::Geo).unwrap().payload["marker"], 3);
        assert!(cache.get("b.test", ProbeKind::Geo).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_writers_last_write_wins() {
        let cache = Arc::new(ProbeCache::new());
        let mut handles = Vec::new();
        for i in 0..16u64 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.put(
                    "race.test",
                    ProbeKind::Dns,
                    result(ProbeKind::Dns, i),
                    Duration::from_secs(60),
                );
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let marker = cache.get("race.test", ProbeKind::Dns).unwrap().payload["marker"]
            .as_u64()
            .unwrap();
        assert!(marker < 16);
        assert_eq!(cache.len(), 1);
    }
}
