//! Common traits for meteo.
//!
//! These traits define the seams between the lookup core and its pluggable
//! backends, enabling modularity and testing.

use std::time::Instant;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CityKey, WeatherReport};

// ═══════════════════════════════════════════════════════════════════════════════
// WEATHER PROVIDER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface to the upstream weather data source.
///
/// Implementations might be:
/// - The real OpenWeatherMap HTTP client (`meteo-owm`)
/// - In-memory fakes for tests
///
/// The core assumes the provider is slow (seconds), rate-limited, and
/// unreliable; it never issues more than one concurrent call per city and
/// does not retry on its own.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetches current weather for the given normalized city key.
    ///
    /// Returns a fully populated [`WeatherReport`] or a typed error; never a
    /// partial result.
    async fn fetch(&self, city: &CityKey) -> Result<WeatherReport>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Time source for TTL freshness checks.
///
/// Injectable so expiry can be tested by advancing a manual clock instead of
/// sleeping.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock [`Clock`] backed by [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
