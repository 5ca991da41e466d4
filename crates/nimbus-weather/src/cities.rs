//! Source of the cities worth keeping warm in the cache.

use async_trait::async_trait;

use nimbus_core::error::WeatherError;

/// Capability interface supplied by the surrounding application, e.g.
/// "every city favorited by any user". Implementations return the full,
/// already-deduplicated set; there is no pagination.
#[async_trait]
pub trait CityProvider: Send + Sync {
    async fn interesting_cities(&self) -> Result<Vec<String>, WeatherError>;
}

/// Fixed list adapter, deduplicated at construction. Useful for
/// deployments that refresh a configured set of cities, and for tests.
pub struct StaticCityList {
    cities: Vec<String>,
}

impl StaticCityList {
    pub fn new<I, S>(cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = std::collections::HashSet::new();
        let cities = cities
            .into_iter()
            .map(Into::into)
            .filter(|c| seen.insert(c.clone()))
            .collect();
        Self { cities }
    }
}

#[async_trait]
impl CityProvider for StaticCityList {
    async fn interesting_cities(&self) -> Result<Vec<String>, WeatherError> {
        Ok(self.cities.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[tokio::test]
    async fn test_static_list_dedupes_preserving_order() {
        let provider = StaticCityList::new(["Paris", "Oslo", "Paris", "Tokyo", "Oslo"]);
        let cities = provider.interesting_cities().await.unwrap();
        assert_eq!(cities, vec!["Paris", "Oslo", "Tokyo"]);
    }

    #[tokio::test]
    async fn test_empty_list() {
        let provider = StaticCityList::new(Vec::<String>::new());
        assert!(provider.interesting_cities().await.unwrap().is_empty());
    }
}
