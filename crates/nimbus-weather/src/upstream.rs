//! HTTP client for the upstream weather provider.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use nimbus_core::config::WeatherConfig;

use crate::types::{WeatherKind, WeatherRecord};

/// Classified outcome of a failed upstream fetch.
///
/// Transport and domain signals collapse into one taxonomy here: an HTTP
/// 404 and a body carrying `cod == "404"` both mean the city does not
/// exist, and the caller treats them identically.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("city not found upstream")]
    NotFound,
    #[error("API key rejected upstream")]
    Unauthorized,
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Upstream("request timed out".to_string())
        } else {
            Self::Upstream(err.to_string())
        }
    }
}

/// Client for one weather provider, holding the API key and a reqwest
/// client with an explicit per-request timeout.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(config: &WeatherConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        })
    }

    #[cfg(test)]
    pub fn new_with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        }
    }

    /// Fetch and normalize weather data for one city.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self, city: &str, kind: WeatherKind) -> Result<WeatherRecord, FetchError> {
        let url = format!(
            "{}{}?q={}&appid={}",
            self.base_url,
            kind.endpoint(),
            urlencoding::encode(city),
            self.api_key
        );

        debug!(city, kind = %kind, "requesting weather data from upstream");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        match status.as_u16() {
            404 => return Err(FetchError::NotFound),
            401 => return Err(FetchError::Unauthorized),
            s if !status.is_success() => {
                return Err(FetchError::Upstream(format!("HTTP {}", s)));
            }
            _ => {}
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Upstream(format!("invalid response body: {}", e)))?;

        // `cod` is overloaded as number or string; coerce before matching.
        let cod = body
            .get("cod")
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();

        match cod.as_str() {
            "404" => Err(FetchError::NotFound),
            "200" => WeatherRecord::from_upstream(kind, &body).map_err(|e| {
                warn!(city, error = %e, "upstream body did not match expected shape");
                FetchError::Upstream(format!("malformed upstream payload: {}", e))
            }),
            other => Err(FetchError::Upstream(format!(
                "unexpected upstream status code: {:?}",
                other
            ))),
        }
    }

}
