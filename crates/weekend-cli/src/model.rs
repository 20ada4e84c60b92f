use serde::{Deserialize, Serialize};

use crate::locations::Location;

/// One entry of the provider's 3-hourly time series, flattened.
#[derive(Debug, Clone, PartialEq)]
pub struct RawForecastSample {
    pub timestamp_unix_seconds: i64,
    pub condition_text: String,
    pub icon_code: String,
    pub temperature_celsius: f64,
    pub humidity_percent: u8,
    pub wind_speed_mps: f64,
    /// Probability of precipitation in `0.0..=1.0`.
    pub precipitation_probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastSource {
    Provider,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: String,
    pub condition_text: String,
    pub temperature_celsius: f64,
    pub humidity_percent: u8,
    pub wind_speed_mps: f64,
    pub precipitation_percent: f64,
    pub icon_code: String,
    pub source: ForecastSource,
}

impl DailyForecast {
    pub fn is_fallback(&self) -> bool {
        self.source == ForecastSource::Fallback
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationWeekendForecast {
    pub location_id: String,
    pub display_name: String,
    pub region: String,
    pub saturday: DailyForecast,
    pub sunday: DailyForecast,
}

impl LocationWeekendForecast {
    pub fn new(location: &Location, saturday: DailyForecast, sunday: DailyForecast) -> Self {
        Self {
            location_id: location.id.to_string(),
            display_name: location.display_name.to_string(),
            region: location.region.to_string(),
            saturday,
            sunday,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Ready,
    MissingCredential,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekendReport {
    pub status: ReportStatus,
    pub timezone: String,
    pub saturday_date: String,
    pub sunday_date: String,
    pub generated_at: String,
    pub forecasts: Vec<LocationWeekendForecast>,
}
