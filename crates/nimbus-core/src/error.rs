//! Typed errors for the weather subsystem.
//!
//! Read-path failures surface to callers as one of these variants; the
//! caller decides user-facing behavior. Batch-refresh failures are logged
//! and isolated rather than propagated.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    /// The upstream provider rejected the city name. Cached negatively so
    /// repeated requests fail fast without an upstream call.
    #[error("invalid city name: city \"{0}\" is invalid")]
    InvalidCity(String),

    /// The API credential was rejected upstream. Configuration fault:
    /// not cached, not retried.
    #[error("invalid API key - please verify your API credentials")]
    Unauthorized,

    /// Transient or unclassified upstream/transport failure. Not cached;
    /// safe to retry on the next call or sweep.
    #[error("upstream weather provider error: {0}")]
    Upstream(String),

    /// The cache store could not be reached or refused the operation.
    #[error("cache store unavailable: {0}")]
    CacheUnavailable(String),
}

impl WeatherError {
    /// User-friendly message suitable for an outer transport layer.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCity(city) => format!("City \"{}\" was not found", city),
            Self::Unauthorized => {
                "The weather service is misconfigured. Please contact support.".to_string()
            }
            Self::Upstream(_) => {
                "Weather data is temporarily unavailable. Please try again later.".to_string()
            }
            Self::CacheUnavailable(_) => {
                "Weather data is temporarily unavailable. Please try again later.".to_string()
            }
        }
    }

    /// Whether a retry could plausibly succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::CacheUnavailable(_))
    }
}
