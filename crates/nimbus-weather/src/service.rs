//! Cache-aside orchestrator and batch refresh engine.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, instrument, warn};

use nimbus_core::config::WeatherConfig;
use nimbus_core::error::WeatherError;

use crate::cities::CityProvider;
use crate::store::{BulkEntry, CacheStore};
use crate::types::{data_key, invalid_key, normalize_city, CurrentWeather, Forecast, WeatherKind, WeatherRecord};
use crate::upstream::{FetchError, UpstreamClient};

/// Serves weather reads through the cache, falling back to the upstream
/// provider on miss, and keeps the cache warm for interesting cities via
/// scheduled batch sweeps.
pub struct WeatherService {
    config: WeatherConfig,
    upstream: UpstreamClient,
    store: Arc<dyn CacheStore>,
    cities: Arc<dyn CityProvider>,
}

impl WeatherService {
    pub fn new(
        config: WeatherConfig,
        store: Arc<dyn CacheStore>,
        cities: Arc<dyn CityProvider>,
    ) -> anyhow::Result<Self> {
        let upstream = UpstreamClient::new(&config)?;
        Ok(Self::with_upstream(config, upstream, store, cities))
    }

    /// Wire in an explicitly constructed upstream client.
    pub fn with_upstream(
        config: WeatherConfig,
        upstream: UpstreamClient,
        store: Arc<dyn CacheStore>,
        cities: Arc<dyn CityProvider>,
    ) -> Self {
        Self { config, upstream, store, cities }
    }

    /// Fetch weather data for one city, cache-aside.
    ///
    /// The negative-cache check strictly precedes the positive check,
    /// which strictly precedes any upstream call. A negative hit fails
    /// exactly like a fresh upstream rejection, so repeated invalid-city
    /// requests are indistinguishable from the first.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self, city: &str, kind: WeatherKind) -> Result<WeatherRecord, WeatherError> {
        let city = normalize_city(city);
        let data_key = data_key(kind, &city);
        let invalid_key = invalid_key(&city);

        debug!(city = %city, kind = %kind, "fetching weather data");

        if self.store.get(&invalid_key).await?.is_some() {
            warn!(city = %city, "city is marked as invalid in cache");
            return Err(WeatherError::InvalidCity(city));
        }

        if let Some(cached) = self.store.get(&data_key).await? {
            match WeatherRecord::from_cached(kind, &cached) {
                Ok(record) => {
                    info!(city = %city, kind = %kind, "cache hit");
                    return Ok(record);
                }
                Err(e) => {
                    warn!(city = %city, kind = %kind, error = %e, "corrupt cache entry, treating as miss");
                }
            }
        }

        info!(city = %city, kind = %kind, "cache miss, fetching from upstream");

        match self.upstream.fetch(&city, kind).await {
            Ok(record) => {
                let json = serde_json::to_string(&record).map_err(|e| {
                    WeatherError::CacheUnavailable(format!("failed to serialize record: {}", e))
                })?;
                self.store
                    .set(&data_key, &json, kind.ttl_secs(&self.config.ttl))
                    .await?;
                info!(city = %city, kind = %kind, "upstream data cached");
                Ok(record)
            }
            Err(FetchError::NotFound) => {
                warn!(city = %city, "city marked as invalid by upstream");
                self.store
                    .set(&invalid_key, "true", self.config.ttl.invalid_secs)
                    .await?;
                Err(WeatherError::InvalidCity(city))
            }
            Err(FetchError::Unauthorized) => {
                error!(city = %city, "upstream rejected API key, check credentials");
                Err(WeatherError::Unauthorized)
            }
            Err(FetchError::Upstream(msg)) => {
                error!(city = %city, kind = %kind, error = %msg, "upstream fetch failed");
                Err(WeatherError::Upstream(msg))
            }
        }
    }

    /// Current conditions for one city.
    pub async fn current_weather(&self, city: &str) -> Result<CurrentWeather, WeatherError> {
        match self.fetch(city, WeatherKind::Current).await? {
            WeatherRecord::Current(weather) => Ok(weather),
            WeatherRecord::Forecast(_) => {
                Err(WeatherError::Upstream("unexpected record shape in cache".to_string()))
            }
        }
    }

    /// Forecast for one city.
    pub async fn forecast(&self, city: &str) -> Result<Forecast, WeatherError> {
        match self.fetch(city, WeatherKind::Forecast).await? {
            WeatherRecord::Forecast(forecast) => Ok(forecast),
            WeatherRecord::Current(_) => {
                Err(WeatherError::Upstream("unexpected record shape in cache".to_string()))
            }
        }
    }

    /// Scheduler entry point for the current-weather sweep.
    pub async fn refresh_current(&self) {
        self.refresh_all(WeatherKind::Current).await;
    }

    /// Scheduler entry point for the forecast sweep.
    pub async fn refresh_forecast(&self) {
        self.refresh_all(WeatherKind::Forecast).await;
    }

    /// Best-effort maintenance sweep over every interesting city.
    ///
    /// Never fails outward: per-city failures are logged and retried on
    /// the next sweep; only a cache-store failure aborts the remainder of
    /// this invocation.
    pub async fn refresh_all(&self, kind: WeatherKind) {
        if let Err(e) = self.run_sweep(kind).await {
            error!(kind = %kind, error = %e, "refresh sweep aborted");
        }
    }

    async fn run_sweep(&self, kind: WeatherKind) -> Result<(), WeatherError> {
        info!(kind = %kind, "starting refresh sweep");

        let cities = self.cities.interesting_cities().await?;
        if cities.is_empty() {
            debug!(kind = %kind, "no interesting cities, nothing to refresh");
            return Ok(());
        }

        let batch_size = self.config.batch_size.max(1);
        let ttl_secs = kind.ttl_secs(&self.config.ttl);

        for (i, batch) in cities.chunks(batch_size).enumerate() {
            let results = join_all(batch.iter().map(|raw| async move {
                let city = normalize_city(raw);
                debug!(city = %city, kind = %kind, "fetching weather data in batch");
                let result = self.upstream.fetch(&city, kind).await;
                (city, result)
            }))
            .await;

            let mut entries: Vec<BulkEntry> = Vec::with_capacity(results.len());
            let mut updated: Vec<String> = Vec::with_capacity(results.len());
            for (city, result) in results {
                match result {
                    Ok(record) => match serde_json::to_string(&record) {
                        Ok(json) => {
                            entries.push((data_key(kind, &city), json, ttl_secs));
                            updated.push(city);
                        }
                        Err(e) => {
                            warn!(city = %city, error = %e, "failed to serialize record, skipping");
                        }
                    },
                    Err(e) => {
                        warn!(city = %city, kind = %kind, error = %e, "batch fetch failed, will retry next sweep");
                    }
                }
            }

            self.store.set_many(&entries).await?;
            info!(kind = %kind, cities = %updated.join(","), "batch updated weather data");

            // Throttle aggregate upstream request rate across the sweep.
            if (i + 1) * batch_size < cities.len() {
                debug!(kind = %kind, "waiting before processing next batch");
                tokio::time::sleep(self.config.batch_pause()).await;
            }
        }

        Ok(())
    }
}
