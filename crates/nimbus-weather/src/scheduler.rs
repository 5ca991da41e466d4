//! Recurring refresh sweeps.
//!
//! Drives [`WeatherService::refresh_all`] on independent fixed cadences
//! for the two data kinds. The sweeps themselves never fail outward, so
//! the scheduler has nothing to retry; a tick that overlaps a still
//! running sweep simply waits for the next interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use nimbus_core::config::RefreshConfig;

use crate::service::WeatherService;
use crate::types::WeatherKind;

/// Handle to the background sweep tasks.
pub struct SweepScheduler {
    handles: Vec<JoinHandle<()>>,
}

impl SweepScheduler {
    /// Spawn the current and forecast sweep loops per the configured
    /// cadence. A cadence of zero minutes disables that sweep.
    pub fn start(service: Arc<WeatherService>, refresh: &RefreshConfig) -> Self {
        let current = (refresh.current_minutes > 0)
            .then(|| Duration::from_secs(refresh.current_minutes * 60));
        let forecast = (refresh.forecast_minutes > 0)
            .then(|| Duration::from_secs(refresh.forecast_minutes * 60));
        Self::start_with_periods(service, current, forecast)
    }

    /// Spawn sweep loops with explicit periods.
    pub fn start_with_periods(
        service: Arc<WeatherService>,
        current: Option<Duration>,
        forecast: Option<Duration>,
    ) -> Self {
        let mut handles = Vec::new();

        if let Some(period) = current {
            handles.push(tokio::spawn(Self::run(
                service.clone(),
                WeatherKind::Current,
                period,
            )));
        }
        if let Some(period) = forecast {
            handles.push(tokio::spawn(Self::run(service, WeatherKind::Forecast, period)));
        }

        Self { handles }
    }

    async fn run(service: Arc<WeatherService>, kind: WeatherKind, period: Duration) {
        info!(kind = %kind, period_secs = period.as_secs(), "sweep scheduled");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; consume it so the first sweep
        // runs one full period after startup, matching the cron cadence.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            info!(kind = %kind, "scheduled refresh sweep triggered");
            service.refresh_all(kind).await;
        }
    }

    /// Stop the sweep loops. Does not interrupt an in-flight sweep's
    /// upstream calls beyond dropping their futures.
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::cities::StaticCityList;
    use crate::store::{CacheStore, MemoryStore};
    use crate::upstream::UpstreamClient;
    use nimbus_core::config::WeatherConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_service(mock_server: &MockServer, store: Arc<MemoryStore>) -> Arc<WeatherService> {
        let mut config = WeatherConfig::default();
        config.api_key = "test-key".to_string();
        config.batch_pause_secs = 0;
        let upstream = UpstreamClient::new_with_base_url("test-key", &mock_server.uri());
        let cities = Arc::new(StaticCityList::new(["Paris"]));
        Arc::new(WeatherService::with_upstream(config, upstream, store, cities))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_scheduled_sweep_populates_cache() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cod": 200,
                "weather": [{"description": "clear sky"}],
                "id": 1,
                "name": "Paris"
            })))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let service = test_service(&mock_server, store.clone());

        let scheduler = SweepScheduler::start_with_periods(
            service,
            Some(Duration::from_millis(50)),
            None,
        );

        tokio::time::sleep(Duration::from_millis(300)).await;
        scheduler.shutdown();

        assert!(store.get("current:paris").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_disabled_cadence_spawns_nothing() {
        let mock_server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let service = test_service(&mock_server, store);

        let refresh = RefreshConfig { current_minutes: 0, forecast_minutes: 0 };
        let scheduler = SweepScheduler::start(service, &refresh);
        assert!(scheduler.handles.is_empty());
        scheduler.shutdown();
    }
}
