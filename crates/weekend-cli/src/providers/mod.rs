use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use crate::config::RuntimeConfig;
use crate::model::RawForecastSample;

pub mod openweather;

/// Source of the 5-day/3-hour forecast series for one coordinate pair.
///
/// Shared by reference across the per-location fan-out threads.
pub trait ForecastApi: Sync {
    fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<Vec<RawForecastSample>, ProviderError>;
}

#[derive(Clone)]
pub struct OpenWeatherProvider {
    client: Client,
    api_key: String,
    language: String,
}

impl OpenWeatherProvider {
    pub fn new(config: &RuntimeConfig, api_key: &str) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ProviderError::Transport(error.without_url().to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            language: config.language.clone(),
        })
    }
}

impl fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("api_key", &"<redacted>")
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl ForecastApi for OpenWeatherProvider {
    fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<Vec<RawForecastSample>, ProviderError> {
        openweather::fetch_forecast(&self.client, &self.api_key, &self.language, lat, lon)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http error ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}
