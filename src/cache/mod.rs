//! Freshness cache.
//!
//! Extracted results are stored under their request [`Fingerprint`] with a
//! creation time and a time-to-live. Expired entries are never returned and
//! are evicted lazily on the next lookup; [`FreshnessCache::sweep_expired`]
//! can be called periodically to bound memory.
//!
//! The cache is an optimization only. Backend failures are logged and
//! treated as misses, never surfaced to the caller.

pub mod fingerprint;

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use fingerprint::Fingerprint;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::options::EngineConfig;
use crate::result::ExtractionResult;

/// One cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    /// URL the result was produced for.
    pub url: String,
    pub value: ExtractionResult,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    /// Instant after which the entry must not be served.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.ttl)
            .ok()
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether `now` is past the entry's deadline.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    /// Age of the entry at `now`, zero if the clock went backwards.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Storage behind a [`FreshnessCache`].
///
/// Implementations must tolerate concurrent calls; racing writes on the same
/// fingerprint resolve last-write-wins.
pub trait CacheBackend: Send + Sync {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>>;

    /// Insert or overwrite.
    fn put(&self, entry: CacheEntry) -> Result<()>;

    fn remove(&self, fingerprint: &Fingerprint) -> Result<()>;

    fn clear(&self) -> Result<()>;

    /// Every stored entry, expired ones included.
    fn entries(&self) -> Result<Vec<CacheEntry>>;
}

/// In-process backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::CacheUnavailable("cache lock poisoned".into())
}

impl CacheBackend for MemoryBackend {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().map_err(poisoned)?.get(fingerprint).cloned())
    }

    fn put(&self, entry: CacheEntry) -> Result<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(entry.fingerprint.clone(), entry);
        Ok(())
    }

    fn remove(&self, fingerprint: &Fingerprint) -> Result<()> {
        self.entries.write().map_err(poisoned)?.remove(fingerprint);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().map_err(poisoned)?.clear();
        Ok(())
    }

    fn entries(&self) -> Result<Vec<CacheEntry>> {
        Ok(self.entries.read().map_err(poisoned)?.values().cloned().collect())
    }
}

/// Durable backend: one JSON file per fingerprint in a directory.
#[derive(Debug, Clone)]
pub struct DiskBackend {
    dir: PathBuf,
}

impl DiskBackend {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| Error::CacheUnavailable(format!("{}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{fingerprint}.json"))
    }

    fn cache_files(&self) -> Result<Vec<PathBuf>> {
        let read_dir = fs::read_dir(&self.dir)
            .map_err(|e| Error::CacheUnavailable(format!("{}: {e}", self.dir.display())))?;

        Ok(read_dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect())
    }
}

impl CacheBackend for DiskBackend {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>> {
        match fs::read(self.path_for(fingerprint)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, entry: CacheEntry) -> Result<()> {
        let path = self.path_for(&entry.fingerprint);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&entry)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, fingerprint: &Fingerprint) -> Result<()> {
        match fs::remove_file(self.path_for(fingerprint)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn clear(&self) -> Result<()> {
        for path in self.cache_files()? {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn entries(&self) -> Result<Vec<CacheEntry>> {
        Ok(self
            .cache_files()?
            .into_iter()
            .filter_map(|path| fs::read(&path).ok())
            .filter_map(|bytes| serde_json::from_slice(&bytes).ok())
            .collect())
    }
}

/// Entry ages bucketed for [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeHistogram {
    pub under_1h: usize,
    pub from_1h_to_6h: usize,
    pub from_6h_to_24h: usize,
    pub over_24h: usize,
}

impl AgeHistogram {
    fn record(&mut self, age: Duration) {
        const HOUR: u64 = 3600;
        match age.as_secs() {
            s if s < HOUR => self.under_1h += 1,
            s if s < 6 * HOUR => self.from_1h_to_6h += 1,
            s if s < 24 * HOUR => self.from_6h_to_24h += 1,
            _ => self.over_24h += 1,
        }
    }
}

/// Snapshot of cache contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub enabled: bool,
    /// Stored entries, expired ones included.
    pub entries: usize,
    /// Entries past their deadline but not yet evicted.
    pub expired: usize,
    /// Default time-to-live.
    pub ttl: Duration,
    pub age_histogram: AgeHistogram,
}

/// TTL cache of extraction results keyed by request fingerprint.
pub struct FreshnessCache {
    backend: Box<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl FreshnessCache {
    /// In-memory cache with the given default TTL. A zero TTL disables it.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_backend(Box::new(MemoryBackend::new()), ttl)
    }

    /// A cache that never stores anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    #[must_use]
    pub fn with_backend(backend: Box<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, clock: Arc::new(SystemClock), ttl }
    }

    /// Replace the clock used for timestamps and expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the cache described by the engine configuration: on disk when
    /// `cache_dir` is set, in memory otherwise.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let ttl = config.cache_ttl();
        match config.cache_dir {
            Some(ref dir) if !ttl.is_zero() => {
                Ok(Self::with_backend(Box::new(DiskBackend::open(dir)?), ttl))
            }
            _ => Ok(Self::new(ttl)),
        }
    }

    /// Whether lookups can ever hit.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Default time-to-live for stored entries.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the entry for `fingerprint` if it is still fresh.
    ///
    /// An expired entry is evicted as a side effect.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        if !self.is_enabled() {
            return None;
        }

        let entry = match self.backend.get(fingerprint) {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(%fingerprint, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        if entry.is_expired(self.clock.now()) {
            debug!(%fingerprint, url = %entry.url, "cache entry expired");
            if let Err(e) = self.backend.remove(fingerprint) {
                warn!(%fingerprint, error = %e, "failed to evict expired cache entry");
            }
            return None;
        }

        debug!(%fingerprint, url = %entry.url, "cache hit");
        Some(entry)
    }

    /// Store `value` under `fingerprint`, overwriting any prior entry.
    ///
    /// A no-op when the cache is disabled or `ttl` is zero.
    pub fn store(&self, fingerprint: Fingerprint, value: ExtractionResult, ttl: Duration) {
        if !self.is_enabled() || ttl.is_zero() {
            return;
        }

        let entry = CacheEntry {
            url: value.url.clone(),
            fingerprint,
            value,
            created_at: self.clock.now(),
            ttl,
        };
        let fingerprint = entry.fingerprint.clone();

        match self.backend.put(entry) {
            Ok(()) => debug!(%fingerprint, ttl_secs = ttl.as_secs(), "cache store"),
            Err(e) => warn!(%fingerprint, error = %e, "cache write failed"),
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Err(e) = self.backend.clear() {
            warn!(error = %e, "cache clear failed");
        }
    }

    /// Evict every expired entry. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let entries = match self.backend.entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "cache sweep failed");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.iter().filter(|e| e.is_expired(now)) {
            if self.backend.remove(&entry.fingerprint).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        removed
    }

    /// Entry count, expired count and age histogram.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.backend.entries().unwrap_or_else(|e| {
            warn!(error = %e, "cache stats unavailable");
            Vec::new()
        });

        let mut age_histogram = AgeHistogram::default();
        let mut expired = 0;
        for entry in &entries {
            age_histogram.record(entry.age(now));
            if entry.is_expired(now) {
                expired += 1;
            }
        }

        CacheStats {
            enabled: self.is_enabled(),
            entries: entries.len(),
            expired,
            ttl: self.ttl,
            age_histogram,
        }
    }
}

impl std::fmt::Debug for FreshnessCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreshnessCache").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultStatus;
    use crate::testing::ManualClock;

    const HOUR: Duration = Duration::from_secs(3600);

    fn result(url: &str) -> ExtractionResult {
        ExtractionResult::failed(url, ResultStatus::Success, "", &[])
    }

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::from_canonical(s)
    }

    #[test]
    fn test_store_then_lookup() {
        let cache = FreshnessCache::new(HOUR);
        cache.store(fp("a"), result("https://a.example"), HOUR);

        let entry = cache.lookup(&fp("a")).expect("entry visible");
        assert_eq!(entry.value.url, "https://a.example");
        assert!(cache.lookup(&fp("b")).is_none());
    }

    #[test]
    fn test_store_overwrites() {
        let cache = FreshnessCache::new(HOUR);
        cache.store(fp("a"), result("https://first.example"), HOUR);
        cache.store(fp("a"), result("https://second.example"), HOUR);

        assert_eq!(cache.lookup(&fp("a")).map(|e| e.value.url).as_deref(), Some("https://second.example"));
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_lookup() {
        let clock = Arc::new(ManualClock::default());
        let cache = FreshnessCache::new(HOUR).with_clock(clock.clone());
        cache.store(fp("a"), result("https://a.example"), HOUR);

        clock.advance(HOUR);
        assert!(cache.lookup(&fp("a")).is_some(), "exactly at the deadline is still fresh");

        clock.advance(Duration::from_secs(1));
        assert!(cache.lookup(&fp("a")).is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_zero_ttl_bypasses_cache() {
        let cache = FreshnessCache::disabled();
        cache.store(fp("a"), result("https://a.example"), HOUR);
        assert!(cache.lookup(&fp("a")).is_none());
        assert!(!cache.stats().enabled);

        let cache = FreshnessCache::new(HOUR);
        cache.store(fp("a"), result("https://a.example"), Duration::ZERO);
        assert!(cache.lookup(&fp("a")).is_none());
    }

    #[test]
    fn test_stats_histogram_and_sweep() {
        let clock = Arc::new(ManualClock::default());
        let cache = FreshnessCache::new(48 * HOUR).with_clock(clock.clone());

        cache.store(fp("old"), result("https://old.example"), 2 * HOUR);
        clock.advance(5 * HOUR);
        cache.store(fp("new"), result("https://new.example"), 48 * HOUR);

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.age_histogram.under_1h, 1);
        assert_eq!(stats.age_histogram.from_1h_to_6h, 1);

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.stats().entries, 1);

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_entry_age_clamps_backwards_clock() {
        let now = Utc::now();
        let entry = CacheEntry {
            fingerprint: fp("x"),
            url: String::new(),
            value: result("https://x.example"),
            created_at: now,
            ttl: HOUR,
        };
        assert_eq!(entry.age(now - TimeDelta::seconds(10)), Duration::ZERO);
    }
}
