//! Core crate for the Nimbus weather cache service.
//!
//! Holds configuration loading/validation and the typed error hierarchy
//! shared by the rest of the workspace.

pub mod config;
pub mod error;

pub use config::{Config, RefreshConfig, TtlConfig, WeatherConfig};
pub use error::WeatherError;

use anyhow::Result;

/// Initialize tracing for the service.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Nimbus core initialized");
    Ok(())
}
