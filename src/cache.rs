//! The answer cache (spec §4.2), grounded directly on the simple
//! `sync.RWMutex`-guarded map in `original_source/cache/cache.go` — a better
//! fit than the teacher's `moka` cache, which doesn't expose the raw
//! whole-map iteration the refresh task and `save`/`load` both need (see
//! DESIGN.md).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;
use tokio::time::interval;

use crate::errors::IoError;
use crate::resolver::Resolver;

/// The exact question domain, trailing-dot normalized — spec §3: "One key
/// per cache entry," keyed on domain alone (not qtype), matching the
/// original Go cache's `map[string]Element`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(pub String);

impl CacheKey {
    pub fn from_domain(domain: &str) -> Self {
        Self(domain.to_string())
    }
}

/// A resolved answer, snapshotted out of the cache by value so callers never
/// alias internal storage (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: IpAddr,
    pub refresh: bool,
    inserted_unix_secs: u64,
    pub resolver: String,
    pub request: Vec<u8>,
}

impl CacheEntry {
    pub fn new(value: IpAddr, refresh: bool, resolver: String, request: Vec<u8>) -> Self {
        Self {
            value,
            refresh,
            inserted_unix_secs: unix_now(),
            resolver,
            request,
        }
    }

    fn age(&self) -> Duration {
        Duration::from_secs(unix_now().saturating_sub(self.inserted_unix_secs))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Process-wide answer cache. Shared by every handler task behind a single
/// `RwLock`-guarded map (spec §5: writes to the same key serialize; reads
/// proceed in parallel; no fairness invariant required).
pub struct AnswerCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    expiry: Duration,
}

impl AnswerCache {
    pub fn new(expiry: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            expiry,
        }
    }

    /// Returns a snapshot of the entry if present and, when `expiry > 0`,
    /// not yet stale. A stale hit is reported as a miss without being
    /// removed — spec §4.2: "the stale entry is not removed synchronously".
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if self.expiry > Duration::ZERO && entry.age() > self.expiry {
            return None;
        }
        Some(entry.clone())
    }

    /// Stamps the insertion time and replaces any prior binding for `key`.
    pub async fn set(&self, key: CacheKey, mut entry: CacheEntry) {
        entry.inserted_unix_secs = unix_now();
        self.entries.write().await.insert(key, entry);
    }

    /// Serializes the current map atomically to `path`.
    pub async fn save(&self, path: &Path) -> Result<(), IoError> {
        let snapshot_path = || path.display().to_string();
        let entries = self.entries.read().await;
        let snapshot: HashMap<&CacheKey, &CacheEntry> = entries.iter().collect();
        let json = serde_json::to_vec(&snapshot).map_err(|e| IoError::SnapshotWrite {
            path: snapshot_path(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        drop(entries);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|source| IoError::SnapshotWrite { path: snapshot_path(), source })?;
        std::fs::rename(&tmp, path).map_err(|source| IoError::SnapshotWrite { path: snapshot_path(), source })
    }

    /// Replaces the map from `path`. A missing file is not an error.
    pub async fn load(&self, path: &Path) -> Result<(), IoError> {
        let snapshot_path = || path.display().to_string();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => return Err(IoError::SnapshotRead { path: snapshot_path(), source }),
        };
        let loaded: HashMap<CacheKey, CacheEntry> = serde_json::from_slice(&bytes).map_err(|e| IoError::SnapshotRead {
            path: snapshot_path(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        *self.entries.write().await = loaded;
        Ok(())
    }

    async fn snapshot_entries(&self) -> Vec<(CacheKey, CacheEntry)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Runs the background refresh task (spec §4.2, §9): every tick, read the
/// entry list under a read hold, drop the lock, re-resolve each
/// `refresh = true` entry's original question, and write back the fresh
/// answer. Entries added/removed between snapshot and write are benign —
/// last writer wins.
pub async fn run_refresh_task(cache: Arc<AnswerCache>, resolver: Arc<Resolver>, period: Duration) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        for (key, entry) in cache.snapshot_entries().await {
            if !entry.refresh {
                continue;
            }
            let Ok(query) = crate::wire::parse_query(&entry.request) else {
                continue;
            };
            match resolver.resolve(&query).await {
                Ok(resolved) => {
                    let fresh = CacheEntry::new(
                        resolved.address,
                        true,
                        resolved.upstream,
                        entry.request.clone(),
                    );
                    cache.set(key, fresh).await;
                }
                Err(e) => {
                    tracing::warn!(domain = %query.domain(), error = %e, "refresh failed, leaving stale entry");
                }
            }
        }
    }
}

/// Runs the background dump task (spec §4.2): periodically `save` to a
/// fixed path. I/O failures are logged, never fatal.
pub async fn run_dump_task(cache: Arc<AnswerCache>, path: PathBuf, period: Duration) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        if let Err(e) = cache.save(&path).await {
            tracing::warn!(error = %e, path = %path.display(), "cache dump failed");
        }
    }
}

/// Default dump interval when persistence is enabled but no interval is
/// configured (spec §4.2: "default one minute when unset").
pub const DEFAULT_DUMP_INTERVAL: Duration = Duration::from_secs(60);

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::thread::sleep;

    fn entry(value: Ipv4Addr, refresh: bool) -> CacheEntry {
        CacheEntry::new(IpAddr::V4(value), refresh, "1.1.1.1:853".into(), vec![1, 2, 3])
    }

    #[tokio::test]
    async fn get_returns_value_within_expiry() {
        let cache = AnswerCache::new(Duration::from_secs(5));
        let key = CacheKey::from_domain("example.com.");
        cache.set(key.clone(), entry(Ipv4Addr::new(93, 184, 216, 34), true)).await;

        let got = cache.get(&key).await.unwrap();
        assert_eq!(got.value, IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)));
    }

    #[tokio::test]
    async fn get_misses_after_expiry() {
        let cache = AnswerCache::new(Duration::from_millis(50));
        let key = CacheKey::from_domain("example.com.");
        cache.set(key.clone(), entry(Ipv4Addr::new(1, 2, 3, 4), false)).await;

        sleep(Duration::from_millis(120));
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn zero_expiry_never_expires() {
        let cache = AnswerCache::new(Duration::ZERO);
        let key = CacheKey::from_domain("example.com.");
        cache.set(key.clone(), entry(Ipv4Addr::new(1, 2, 3, 4), false)).await;
        sleep(Duration::from_millis(50));
        assert!(cache.get(&key).await.is_some());
    }

    #[tokio::test]
    async fn save_then_load_preserves_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.dump");

        let cache = AnswerCache::new(Duration::ZERO);
        let k1 = CacheKey::from_domain("a.example.");
        let k2 = CacheKey::from_domain("b.example.");
        cache.set(k1.clone(), entry(Ipv4Addr::new(1, 1, 1, 1), true)).await;
        cache.set(k2.clone(), entry(Ipv4Addr::new(2, 2, 2, 2), false)).await;
        cache.save(&path).await.unwrap();

        let fresh = AnswerCache::new(Duration::ZERO);
        fresh.load(&path).await.unwrap();

        assert_eq!(fresh.get(&k1).await.unwrap().value, IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)));
        assert_eq!(fresh.get(&k2).await.unwrap().value, IpAddr::V4(Ipv4Addr::new(2, 2, 2, 2)));
    }

    #[tokio::test]
    async fn load_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.dump");
        let cache = AnswerCache::new(Duration::ZERO);
        cache.load(&path).await.unwrap();
    }

    #[tokio::test]
    async fn set_replaces_prior_binding() {
        let cache = AnswerCache::new(Duration::ZERO);
        let key = CacheKey::from_domain("example.com.");
        cache.set(key.clone(), entry(Ipv4Addr::new(1, 1, 1, 1), true)).await;
        cache.set(key.clone(), entry(Ipv4Addr::new(2, 2, 2, 2), true)).await;
        assert_eq!(cache.get(&key).await.unwrap().value, IpAddr::V4(Ipv4Addr::new(2, 2, 2, 2)));
    }
}
