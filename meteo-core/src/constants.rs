//! Workspace-wide defaults.

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default time-to-live for a cached weather report, in seconds (1 hour).
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Default cache capacity in entries.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

// ═══════════════════════════════════════════════════════════════════════════════
// PROVIDER DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default HTTP request timeout for provider calls, in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// OpenWeatherMap current-weather endpoint.
pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Units parameter requesting Celsius / metres-per-second.
pub const METRIC_UNITS: &str = "metric";
