use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::RawForecastSample;

use super::ProviderError;

const FORECAST_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/forecast";
const UNITS: &str = "metric";

#[derive(Debug, Serialize)]
struct ForecastQuery<'a> {
    lat: f64,
    lon: f64,
    units: &'a str,
    lang: &'a str,
    appid: &'a str,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Option<Vec<ForecastItem>>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt: i64,
    #[serde(default)]
    weather: Vec<WeatherEntry>,
    main: MainBlock,
    wind: WindBlock,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherEntry {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
}

pub fn fetch_forecast(
    client: &Client,
    api_key: &str,
    language: &str,
    lat: f64,
    lon: f64,
) -> Result<Vec<RawForecastSample>, ProviderError> {
    let query = ForecastQuery {
        lat,
        lon,
        units: UNITS,
        lang: language,
        appid: api_key,
    };

    let body = execute_request(client.get(FORECAST_ENDPOINT).query(&query))?;
    parse_forecast_response(&body)
}

fn execute_request(request: RequestBuilder) -> Result<String, ProviderError> {
    // The request URL carries the API key; keep it out of error messages.
    let response = request
        .send()
        .map_err(|error| ProviderError::Transport(error.without_url().to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|error| ProviderError::Transport(error.without_url().to_string()))?;

    if status.is_success() {
        return Ok(body);
    }

    let message = extract_error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    Err(ProviderError::Http {
        status: status.as_u16(),
        message,
    })
}

pub(crate) fn parse_forecast_response(body: &str) -> Result<Vec<RawForecastSample>, ProviderError> {
    let payload: ForecastResponse = serde_json::from_str(body)
        .map_err(|error| ProviderError::InvalidResponse(format!("forecast payload: {error}")))?;

    let items = payload
        .list
        .ok_or_else(|| ProviderError::InvalidResponse("forecast payload: missing list".into()))?;

    items.into_iter().map(build_sample).collect()
}

fn build_sample(item: ForecastItem) -> Result<RawForecastSample, ProviderError> {
    let Some(weather) = item.weather.into_iter().next() else {
        return Err(ProviderError::InvalidResponse(format!(
            "forecast payload: empty weather at dt={}",
            item.dt
        )));
    };

    Ok(RawForecastSample {
        timestamp_unix_seconds: item.dt,
        condition_text: weather.description,
        icon_code: weather.icon,
        temperature_celsius: item.main.temp,
        humidity_percent: item.main.humidity,
        wind_speed_mps: item.wind.speed,
        precipitation_probability: item.pop,
    })
}

fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let from_json = serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|json| {
            json.get("message")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|message| !message.is_empty())
                .map(str::to_string)
        });

    from_json.or_else(|| Some(trimmed.to_string()))
}
