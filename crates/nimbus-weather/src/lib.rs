//! Weather acquisition and caching for Nimbus.
//!
//! Serves current/forecast weather for a city with a cache-aside read path,
//! negative caching of invalid city names, and scheduled batch refresh of
//! every city currently of interest.

pub mod cities;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod types;
pub mod upstream;

pub use cities::{CityProvider, StaticCityList};
pub use scheduler::SweepScheduler;
pub use service::WeatherService;
pub use store::{CacheStore, MemoryStore, RedisStore};
pub use types::{CurrentWeather, Forecast, WeatherKind, WeatherRecord};
pub use upstream::UpstreamClient;
