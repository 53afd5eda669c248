//! Error types for meteo.
//!
//! One shared error enum using `thiserror`. Every variant carries only owned
//! strings so the whole enum is `Clone`: a single fetch outcome is handed
//! verbatim to every caller waiting on the same in-flight request.

use thiserror::Error;

/// Result type alias using `MeteoError`.
pub type Result<T> = std::result::Result<T, MeteoError>;

/// Main error type for all meteo operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeteoError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CALLER ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Empty or whitespace-only city name.
    #[error("Invalid city name: {0:?}")]
    InvalidCity(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // PROVIDER ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// The provider does not know the requested city (HTTP 404).
    #[error("City not found: {0}")]
    CityNotFound(String),

    /// Network failure, timeout, or provider-side error (5xx).
    #[error("Weather provider unavailable: {reason}")]
    ProviderUnavailable {
        /// Transport or status description.
        reason: String,
    },

    /// Successful status but a body the provider contract does not allow.
    #[error("Malformed provider response for '{city}': {reason}")]
    MalformedResponse {
        /// City the request was for.
        city: String,
        /// What was missing or unparseable.
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // LIFECYCLE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// The fetch was abandoned before it resolved (deadline or dropped leader).
    #[error("Lookup cancelled: {0}")]
    Cancelled(String),
}

impl MeteoError {
    /// Returns true if this error is transient (a retry may succeed).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MeteoError::ProviderUnavailable { .. } | MeteoError::Cancelled(_)
        )
    }

    /// Returns true if this error is the caller's fault (retrying is pointless).
    pub fn is_caller_error(&self) -> bool {
        matches!(self, MeteoError::InvalidCity(_))
    }
}
