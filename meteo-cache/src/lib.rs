//! TTL cache for normalized weather reports.
//!
//! In-memory store with configurable capacity and expiration. Expired entries
//! disappear from the read path but remain retrievable for stale fallback.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;

pub use cache::{CacheConfig, CacheStats, WeatherCache};
