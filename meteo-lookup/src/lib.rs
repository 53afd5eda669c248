//! # Meteo Lookup
//!
//! Cache-aside weather lookup with per-city request coalescing.
//!
//! [`WeatherLookupService`] is the public surface: normalize the city name,
//! serve a fresh cache hit, otherwise fetch through [`CoalescingFetcher`],
//! which guarantees at most one outstanding provider call per city no matter
//! how many callers miss the cache at once.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod fetcher;
mod service;

pub use fetcher::CoalescingFetcher;
pub use meteo_cache::{CacheConfig, CacheStats, WeatherCache};
pub use meteo_core::{CityKey, MeteoError, Result, WeatherReport, WeatherSnapshot};
pub use service::{LookupConfig, WeatherLookupService};
