//! In-memory TTL cache for weather reports.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use meteo_core::constants::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECONDS};
use meteo_core::traits::{Clock, SystemClock};
use meteo_core::types::{CityKey, WeatherReport};

/// Cache entry with TTL.
#[derive(Clone)]
struct CacheEntry {
    report: WeatherReport,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Default TTL in seconds
    pub default_ttl_seconds: u64,
    /// Whether to auto-cleanup expired entries
    pub auto_cleanup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
            auto_cleanup: true,
        }
    }
}

/// In-memory cache for weather reports.
///
/// Thread-safe and TTL-based. An expired entry behaves as absent on [`get`]
/// but stays retrievable through [`get_stale`] until overwritten or evicted,
/// which is what the stale-fallback path in `meteo-lookup` relies on.
///
/// [`get`]: WeatherCache::get
/// [`get_stale`]: WeatherCache::get_stale
pub struct WeatherCache {
    entries: RwLock<HashMap<CityKey, CacheEntry>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl WeatherCache {
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache with an injected clock (for TTL tests).
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(config.max_entries)),
            config,
            clock,
        }
    }

    /// Gets a cached report if present and fresh.
    ///
    /// A present-but-expired entry returns `None`; it is not removed.
    pub fn get(&self, city: &CityKey) -> Option<WeatherReport> {
        let now = self.clock.now();
        let entries = self.entries.read();
        entries.get(city).and_then(|e| {
            if e.is_fresh(now) {
                Some(e.report.clone())
            } else {
                None
            }
        })
    }

    /// Gets a cached report regardless of freshness.
    ///
    /// Fallback accessor for serving expired data when a refresh fails.
    pub fn get_stale(&self, city: &CityKey) -> Option<WeatherReport> {
        self.entries.read().get(city).map(|e| e.report.clone())
    }

    /// Caches a report with the default TTL, overwriting any existing entry.
    pub fn put(&self, city: &CityKey, report: WeatherReport) {
        self.put_with_ttl(
            city,
            report,
            Duration::from_secs(self.config.default_ttl_seconds),
        );
    }

    /// Caches a report with a custom TTL.
    pub fn put_with_ttl(&self, city: &CityKey, report: WeatherReport, ttl: Duration) {
        let now = self.clock.now();
        let mut entries = self.entries.write();

        if self.config.auto_cleanup && entries.len() >= self.config.max_entries {
            entries.retain(|_, e| e.is_fresh(now));
        }
        if entries.len() >= self.config.max_entries {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
            }
        }

        entries.insert(
            city.clone(),
            CacheEntry {
                report,
                stored_at: now,
                ttl,
            },
        );
    }

    /// Removes a cached entry. Idempotent.
    pub fn invalidate(&self, city: &CityKey) {
        self.entries.write().remove(city);
    }

    /// Clears all cached entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Removes all expired entries.
    pub fn cleanup_expired(&self) {
        let now = self.clock.now();
        self.entries.write().retain(|_, e| e.is_fresh(now));
    }

    /// Returns the number of cached entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.entries.read();
        let expired = entries.values().filter(|e| !e.is_fresh(now)).count();
        CacheStats {
            total_entries: entries.len(),
            expired_entries: expired,
            valid_entries: entries.len().saturating_sub(expired),
            capacity: self.config.max_entries,
        }
    }
}

impl Default for WeatherCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug)]
pub struct CacheStats {
    /// All entries currently held, fresh or expired.
    pub total_entries: usize,
    /// Entries past their TTL.
    pub expired_entries: usize,
    /// Entries still fresh.
    pub valid_entries: usize,
    /// Configured capacity.
    pub capacity: usize,
}
