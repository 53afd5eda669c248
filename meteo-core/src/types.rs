//! Domain types for the weather lookup core.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MeteoError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// CITY KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Normalized cache key derived from a raw city name.
///
/// Two inputs that differ only in case or surrounding whitespace normalize to
/// the same key, so `"Paris"` and `"  paris "` address the same cache entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityKey(String);

impl CityKey {
    /// Normalizes a raw city name into a key.
    ///
    /// Returns [`MeteoError::InvalidCity`] for empty or whitespace-only input.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(MeteoError::InvalidCity(raw.to_string()));
        }
        Ok(Self(normalized))
    }

    /// The normalized key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WEATHER REPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Normalized current-weather data for one city.
///
/// Produced only from a complete provider response: either every field is
/// populated or the fetch failed. No partial construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// City name as the provider spells it (e.g. "Marseille").
    pub city: String,
    /// Temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Human-readable conditions (e.g. "ensoleillé").
    pub description: String,
    /// Relative humidity, 0..=100.
    pub humidity_pct: u8,
    /// Wind speed in metres per second.
    pub wind_speed_ms: f64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOOKUP SNAPSHOT
// ═══════════════════════════════════════════════════════════════════════════════

/// A lookup result together with where it came from.
///
/// `cached` mirrors the flag the surrounding API surfaces to clients; `stale`
/// is set only when a provider failure was papered over with an expired entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// The weather data.
    pub report: WeatherReport,
    /// True if the report was served from the cache rather than fetched.
    pub cached: bool,
    /// True if the cached report had already expired (stale fallback).
    pub stale: bool,
}

impl WeatherSnapshot {
    /// Snapshot for a report fetched from the provider on this call.
    pub fn fetched(report: WeatherReport) -> Self {
        Self { report, cached: false, stale: false }
    }

    /// Snapshot for a fresh cache hit.
    pub fn from_cache(report: WeatherReport) -> Self {
        Self { report, cached: true, stale: false }
    }

    /// Snapshot for an expired entry served because the provider failed.
    pub fn stale_fallback(report: WeatherReport) -> Self {
        Self { report, cached: true, stale: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Paris", "paris"; "case folded")]
    #[test_case("  paris ", "paris"; "trimmed")]
    #[test_case("NEW YORK", "new york"; "inner whitespace kept")]
    #[test_case("Marseille", "marseille"; "plain")]
    fn test_city_key_normalization(raw: &str, expected: &str) {
        let key = CityKey::parse(raw).unwrap();
        assert_eq!(key.as_str(), expected);
    }

    #[test_case(""; "empty")]
    #[test_case("   "; "whitespace only")]
    #[test_case("\t\n"; "tabs and newlines")]
    fn test_city_key_rejects_blank(raw: &str) {
        assert!(matches!(
            CityKey::parse(raw),
            Err(MeteoError::InvalidCity(_))
        ));
    }

    #[test]
    fn test_city_key_equality_after_normalization() {
        assert_eq!(
            CityKey::parse("Paris").unwrap(),
            CityKey::parse("  paris ").unwrap()
        );
    }

    #[test]
    fn test_report_json_round_trip() {
        let report = WeatherReport {
            city: "Marseille".into(),
            temperature_c: 22.5,
            description: "ensoleillé".into(),
            humidity_pct: 56,
            wind_speed_ms: 3.4,
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: WeatherReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_snapshot_constructors() {
        let report = WeatherReport {
            city: "Paris".into(),
            temperature_c: 19.2,
            description: "nuageux".into(),
            humidity_pct: 63,
            wind_speed_ms: 4.1,
        };
        assert!(!WeatherSnapshot::fetched(report.clone()).cached);
        assert!(WeatherSnapshot::from_cache(report.clone()).cached);
        let stale = WeatherSnapshot::stale_fallback(report);
        assert!(stale.cached);
        assert!(stale.stale);
    }
}
