//! # Meteo Core
//!
//! Core types, errors, and traits for the meteo weather lookup service.
//!
//! This crate provides the foundational building blocks used by all other meteo crates:
//!
//! - **Types**: Normalized city keys, weather reports, and lookup snapshots
//! - **Errors**: Typed failure taxonomy shared across the workspace
//! - **Constants**: Defaults for TTL, timeouts, and the provider endpoint
//! - **Traits**: The provider and clock seams for pluggable backends
//!
//! ## Example
//!
//! ```rust
//! use meteo_core::{CityKey, WeatherReport};
//!
//! let key = CityKey::parse("  Paris ").unwrap();
//! assert_eq!(key.as_str(), "paris");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{MeteoError, Result};
pub use traits::*;
pub use types::*;
