//! Public lookup surface composing cache and coalescing fetcher.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use meteo_cache::{CacheConfig, CacheStats, WeatherCache};
use meteo_core::error::Result;
use meteo_core::traits::{Clock, WeatherProvider};
use meteo_core::types::{CityKey, WeatherSnapshot};

use crate::fetcher::CoalescingFetcher;

/// Lookup service configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Cache configuration
    pub cache: CacheConfig,
    /// Whether to use caching
    pub enable_cache: bool,
    /// Whether a provider failure may serve an expired entry
    pub stale_fallback: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            enable_cache: true,
            stale_fallback: true,
        }
    }
}

impl LookupConfig {
    /// Overrides the cache configuration.
    pub fn with_cache_config(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Disables caching (every lookup fetches, still coalesced).
    pub fn no_cache(mut self) -> Self {
        self.enable_cache = false;
        self
    }

    /// Disables stale fallback (provider failures always propagate).
    pub fn no_stale_fallback(mut self) -> Self {
        self.stale_fallback = false;
        self
    }
}

/// Weather lookup service.
///
/// Resolves a raw city name to a [`WeatherSnapshot`] by:
/// 1. Normalizing the name into a [`CityKey`]
/// 2. Serving a fresh cache hit
/// 3. Otherwise fetching through the [`CoalescingFetcher`], which populates
///    the cache and guarantees one provider call per city
/// 4. On fetch failure, optionally serving an expired entry flagged `stale`
///
/// Owns its cache and in-flight table; construct one per provider, no
/// process-wide state.
pub struct WeatherLookupService {
    fetcher: CoalescingFetcher,
    cache: Option<Arc<WeatherCache>>,
    config: LookupConfig,
}

impl WeatherLookupService {
    /// Creates a service with default configuration.
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self::with_config(provider, LookupConfig::default())
    }

    /// Creates a service with custom configuration.
    pub fn with_config(provider: Arc<dyn WeatherProvider>, config: LookupConfig) -> Self {
        let cache = config
            .enable_cache
            .then(|| Arc::new(WeatherCache::with_config(config.cache.clone())));
        Self {
            fetcher: CoalescingFetcher::new(provider, cache.clone()),
            cache,
            config,
        }
    }

    /// Creates a service with an injected clock (for TTL tests).
    pub fn with_clock(
        provider: Arc<dyn WeatherProvider>,
        config: LookupConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = config
            .enable_cache
            .then(|| Arc::new(WeatherCache::with_clock(config.cache.clone(), clock)));
        Self {
            fetcher: CoalescingFetcher::new(provider, cache.clone()),
            cache,
            config,
        }
    }

    /// Looks up current weather for a raw city name.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let service = WeatherLookupService::new(Arc::new(client));
    /// let snapshot = service.lookup("Marseille").await?;
    /// println!("{}°C (cached: {})", snapshot.report.temperature_c, snapshot.cached);
    /// ```
    #[instrument(skip(self))]
    pub async fn lookup(&self, raw_city: &str) -> Result<WeatherSnapshot> {
        let city = CityKey::parse(raw_city)?;

        if let Some(cache) = &self.cache {
            if let Some(report) = cache.get(&city) {
                debug!(%city, "Cache hit");
                return Ok(WeatherSnapshot::from_cache(report));
            }
        }

        debug!(%city, "Cache miss, fetching");

        match self.fetcher.fetch_once(&city).await {
            Ok(report) => {
                info!(%city, "Fetched current weather");
                Ok(WeatherSnapshot::fetched(report))
            }
            Err(err) => {
                if self.config.stale_fallback {
                    if let Some(report) = self.cache.as_ref().and_then(|c| c.get_stale(&city)) {
                        warn!(%city, error = %err, "Provider failed, serving stale entry");
                        return Ok(WeatherSnapshot::stale_fallback(report));
                    }
                }
                Err(err)
            }
        }
    }

    /// Drops the cached entry for a city, if any. Idempotent.
    pub fn invalidate(&self, raw_city: &str) -> Result<()> {
        let city = CityKey::parse(raw_city)?;
        if let Some(cache) = &self.cache {
            cache.invalidate(&city);
        }
        Ok(())
    }

    /// Clears the whole cache.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Cache statistics, if caching is enabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }
}
