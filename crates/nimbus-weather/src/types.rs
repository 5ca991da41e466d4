//! Normalized weather data shapes and cache keys.
//!
//! The upstream API overloads its `cod` status field as either a number or
//! a string; both are coerced to a string at the parse boundary and never
//! propagate inward raw. Unknown upstream fields are dropped, missing
//! optional fields get defaults.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use nimbus_core::config::TtlConfig;

/// Which kind of weather data a request or cache entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherKind {
    Current,
    Forecast,
}

impl WeatherKind {
    /// Cache-key prefix for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Forecast => "forecast",
        }
    }

    /// Upstream endpoint path for this kind.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Current => "/weather",
            Self::Forecast => "/forecast",
        }
    }

    /// Cache lifetime for entries of this kind.
    pub fn ttl_secs(&self, ttl: &TtlConfig) -> u64 {
        match self {
            Self::Current => ttl.current_secs,
            Self::Forecast => ttl.forecast_secs,
        }
    }
}

impl std::fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a raw city name for key construction: callers may pass raw
/// user input.
pub fn normalize_city(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Cache key for a positive weather entry: `{kind}:{city}`.
pub fn data_key(kind: WeatherKind, city: &str) -> String {
    format!("{}:{}", kind.as_str(), city)
}

/// Cache key for a negative marker: `invalid:{city}`.
pub fn invalid_key(city: &str) -> String {
    format!("invalid:{}", city)
}

fn cod_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    })
}

fn message_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        // The API sends `message: 0` on success; treat it as absent.
        Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// One weather condition description, e.g. "clear sky".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSummary {
    #[serde(default)]
    pub description: String,
}

/// Normalized current-weather result for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    #[serde(default, deserialize_with = "cod_as_string")]
    pub cod: String,
    #[serde(default, deserialize_with = "message_or_default")]
    pub message: String,
    #[serde(default)]
    pub weather: Vec<ConditionSummary>,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// One timestamped forecast entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    #[serde(default)]
    pub dt_txt: String,
    #[serde(default)]
    pub weather: Vec<ConditionSummary>,
}

/// City metadata carried by forecast responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityDetails {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// Normalized forecast result for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default, deserialize_with = "cod_as_string")]
    pub cod: String,
    #[serde(default, deserialize_with = "message_or_default")]
    pub message: String,
    #[serde(default)]
    pub list: Vec<ForecastEntry>,
    #[serde(default)]
    pub city: CityDetails,
}

/// A normalized weather record of either kind, as stored in the cache.
///
/// Serializes to the bare payload shape; deserialization goes through
/// [`WeatherRecord::from_cached`] because the kind is known from the key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WeatherRecord {
    Current(CurrentWeather),
    Forecast(Forecast),
}

impl WeatherRecord {
    /// Parse a raw upstream body into the normalized shape for `kind`.
    pub fn from_upstream(kind: WeatherKind, body: &Value) -> Result<Self, serde_json::Error> {
        match kind {
            WeatherKind::Current => {
                serde_json::from_value(body.clone()).map(WeatherRecord::Current)
            }
            WeatherKind::Forecast => {
                serde_json::from_value(body.clone()).map(WeatherRecord::Forecast)
            }
        }
    }

    /// Parse a cached JSON value back into the record for `kind`.
    pub fn from_cached(kind: WeatherKind, json: &str) -> Result<Self, serde_json::Error> {
        match kind {
            WeatherKind::Current => serde_json::from_str(json).map(WeatherRecord::Current),
            WeatherKind::Forecast => serde_json::from_str(json).map(WeatherRecord::Forecast),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_city() {
        assert_eq!(normalize_city("  Paris "), "paris");
        assert_eq!(normalize_city("NEW YORK"), "new york");
        assert_eq!(normalize_city("oslo"), "oslo");
    }

    #[test]
    fn test_cache_keys() {
        assert_eq!(data_key(WeatherKind::Current, "paris"), "current:paris");
        assert_eq!(data_key(WeatherKind::Forecast, "paris"), "forecast:paris");
        assert_eq!(invalid_key("nowhereville"), "invalid:nowhereville");
    }

    #[test]
    fn test_cod_accepts_number_and_string() {
        let from_number: CurrentWeather =
            serde_json::from_value(json!({"cod": 200, "name": "Paris"})).unwrap();
        assert_eq!(from_number.cod, "200");

        let from_string: CurrentWeather =
            serde_json::from_value(json!({"cod": "404"})).unwrap();
        assert_eq!(from_string.cod, "404");
    }

    #[test]
    fn test_missing_message_defaults_to_empty() {
        let weather: CurrentWeather = serde_json::from_value(json!({"cod": 200})).unwrap();
        assert_eq!(weather.message, "");
    }

    #[test]
    fn test_numeric_zero_message_treated_as_absent() {
        let forecast: Forecast =
            serde_json::from_value(json!({"cod": "200", "message": 0})).unwrap();
        assert_eq!(forecast.message, "");
    }

    #[test]
    fn test_extraneous_fields_dropped() {
        let body = json!({
            "cod": 200,
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
            "main": {"temp": 289.92, "humidity": 55},
            "wind": {"speed": 2.3},
            "id": 2988507,
            "name": "Paris"
        });
        let weather: CurrentWeather = serde_json::from_value(body).unwrap();
        assert_eq!(weather.weather.len(), 1);
        assert_eq!(weather.weather[0].description, "clear sky");
        assert_eq!(weather.id, 2988507);
        assert_eq!(weather.name, "Paris");

        let round_trip = serde_json::to_value(&weather).unwrap();
        assert!(round_trip.get("main").is_none());
        assert!(round_trip.get("wind").is_none());
    }

    #[test]
    fn test_forecast_shape() {
        let body = json!({
            "cod": "200",
            "message": 0,
            "list": [
                {"dt": 1734001200, "dt_txt": "2024-12-12 12:00:00", "weather": [{"description": "light rain"}]},
                {"dt": 1734012000, "dt_txt": "2024-12-12 15:00:00", "weather": [{"description": "overcast clouds"}]}
            ],
            "city": {"id": 2988507, "name": "Paris", "coord": {"lat": 48.85, "lon": 2.35}}
        });
        let forecast: Forecast = serde_json::from_value(body).unwrap();
        assert_eq!(forecast.cod, "200");
        assert_eq!(forecast.list.len(), 2);
        assert_eq!(forecast.list[0].dt_txt, "2024-12-12 12:00:00");
        assert_eq!(forecast.city.name, "Paris");
        assert_eq!(forecast.city.id, 2988507);
    }

    #[test]
    fn test_record_cache_round_trip() {
        let record = WeatherRecord::Current(CurrentWeather {
            cod: "200".to_string(),
            message: String::new(),
            weather: vec![ConditionSummary { description: "clear sky".to_string() }],
            id: 2988507,
            name: "Paris".to_string(),
        });

        let json = serde_json::to_string(&record).unwrap();
        let parsed = WeatherRecord::from_cached(WeatherKind::Current, &json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_kind_ttl_selection() {
        let ttl = TtlConfig::default();
        assert_eq!(WeatherKind::Current.ttl_secs(&ttl), 3600);
        assert_eq!(WeatherKind::Forecast.ttl_secs(&ttl), 10800);
    }
}
