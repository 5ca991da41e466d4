use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Weather subsystem settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Connection string for the shared cache store
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

/// Cache entry lifetimes, in seconds.
///
/// Forecast data changes slower than current conditions, and invalid
/// markers are held longest because a misspelled city name will not
/// start existing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TtlConfig {
    #[serde(default = "default_ttl_current")]
    pub current_secs: u64,
    #[serde(default = "default_ttl_forecast")]
    pub forecast_secs: u64,
    #[serde(default = "default_ttl_invalid")]
    pub invalid_secs: u64,
}

fn default_ttl_current() -> u64 {
    3600
}

fn default_ttl_forecast() -> u64 {
    3 * 3600
}

fn default_ttl_invalid() -> u64 {
    6 * 3600
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            current_secs: default_ttl_current(),
            forecast_secs: default_ttl_forecast(),
            invalid_secs: default_ttl_invalid(),
        }
    }
}

/// Cadence of the scheduled refresh sweeps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Minutes between current-weather sweeps (default: 60)
    #[serde(default = "default_current_refresh")]
    pub current_minutes: u64,
    /// Minutes between forecast sweeps (default: 180)
    #[serde(default = "default_forecast_refresh")]
    pub forecast_minutes: u64,
}

fn default_current_refresh() -> u64 {
    60
}

fn default_forecast_refresh() -> u64 {
    180
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            current_minutes: default_current_refresh(),
            forecast_minutes: default_forecast_refresh(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// API key for the upstream weather provider
    pub api_key: String,

    /// Base URL of the upstream weather API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout at the upstream client boundary, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Cache entry lifetimes
    #[serde(default)]
    pub ttl: TtlConfig,

    /// Number of upstream calls issued concurrently per refresh batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between refresh batches, in seconds
    #[serde(default = "default_batch_pause")]
    pub batch_pause_secs: u64,

    /// Sweep cadence
    #[serde(default)]
    pub refresh: RefreshConfig,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_pause() -> u64 {
    5
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: "YOUR_WEATHER_API_KEY".to_string(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            ttl: TtlConfig::default(),
            batch_size: default_batch_size(),
            batch_pause_secs: default_batch_pause(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl WeatherConfig {
    /// Check if the API key is configured (not a placeholder)
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_key.starts_with("YOUR_")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_secs(self.batch_pause_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weather: WeatherConfig::default(),
            redis_url: default_redis_url(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist.
    ///
    /// `WEATHER_API_KEY` in the environment overrides the file value.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&contents).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save()?;
            config
        };

        if let Ok(key) = std::env::var("WEATHER_API_KEY") {
            config.weather.api_key = key;
        }

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        if !validation.warnings.is_empty() {
            for warning in &validation.warnings {
                tracing::warn!("Config warning: {}", warning);
            }
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if !self.weather.is_configured() {
            result.add_warning(
                "weather.api_key",
                "Weather API key not configured - upstream calls will be rejected",
            );
        }

        if self.weather.batch_size == 0 {
            result.add_error("weather.batch_size", "Batch size must be greater than 0");
        } else if self.weather.batch_size > 50 {
            result.add_warning(
                "weather.batch_size",
                "Batch size is unusually large (>50); upstream rate limits may apply",
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.weather.ttl.current_secs == 0
            || self.weather.ttl.forecast_secs == 0
            || self.weather.ttl.invalid_secs == 0
        {
            result.add_error("weather.ttl", "Cache TTLs must be greater than 0");
        }

        if self.weather.refresh.current_minutes == 0 {
            result.add_warning(
                "weather.refresh.current_minutes",
                "Current-weather refresh sweep disabled (0 minutes)",
            );
        }
        if self.weather.refresh.forecast_minutes == 0 {
            result.add_warning(
                "weather.refresh.forecast_minutes",
                "Forecast refresh sweep disabled (0 minutes)",
            );
        }

        if self.redis_url.is_empty() {
            result.add_error("redis_url", "Cache store URL must not be empty");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("nimbus");

        Ok(config_dir.join("config.toml"))
    }
}
