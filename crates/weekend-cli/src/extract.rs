use chrono::{DateTime, NaiveDate, TimeZone, Timelike};

use crate::model::{DailyForecast, ForecastSource, RawForecastSample};
use crate::weekend::iso_date;

const TARGET_HOUR: i64 = 12;

pub const FALLBACK_CONDITION: &str = "データなし";
pub const FALLBACK_TEMPERATURE_C: f64 = 20.0;
pub const FALLBACK_HUMIDITY_PCT: u8 = 50;
pub const FALLBACK_WIND_MPS: f64 = 3.0;
pub const FALLBACK_ICON: &str = "03d";

/// Picks the sample on `target` whose local hour in `tz` is closest to noon.
/// Ties keep the earliest sample in input order.
pub fn extract_day_forecast<Z: TimeZone>(
    samples: &[RawForecastSample],
    target: NaiveDate,
    tz: &Z,
) -> Option<DailyForecast> {
    let selected = samples
        .iter()
        .filter_map(|sample| local_time(sample, tz).map(|local| (sample, local)))
        .filter(|(_, local)| local.date_naive() == target)
        .min_by_key(|(_, local)| (i64::from(local.hour()) - TARGET_HOUR).abs())
        .map(|(sample, _)| sample)?;

    tracing::debug!(
        date = %target,
        timestamp = selected.timestamp_unix_seconds,
        "selected sample nearest to noon"
    );

    Some(DailyForecast {
        date: iso_date(target),
        condition_text: selected.condition_text.clone(),
        temperature_celsius: selected.temperature_celsius,
        humidity_percent: selected.humidity_percent,
        wind_speed_mps: selected.wind_speed_mps,
        precipitation_percent: precipitation_percent(selected.precipitation_probability),
        icon_code: selected.icon_code.clone(),
        source: ForecastSource::Provider,
    })
}

pub fn fallback_forecast(date: NaiveDate) -> DailyForecast {
    DailyForecast {
        date: iso_date(date),
        condition_text: FALLBACK_CONDITION.to_string(),
        temperature_celsius: FALLBACK_TEMPERATURE_C,
        humidity_percent: FALLBACK_HUMIDITY_PCT,
        wind_speed_mps: FALLBACK_WIND_MPS,
        precipitation_percent: 0.0,
        icon_code: FALLBACK_ICON.to_string(),
        source: ForecastSource::Fallback,
    }
}

pub fn extract_or_fallback<Z: TimeZone>(
    samples: &[RawForecastSample],
    target: NaiveDate,
    tz: &Z,
) -> DailyForecast {
    extract_day_forecast(samples, target, tz).unwrap_or_else(|| {
        tracing::debug!(date = %target, "no sample on target date, using fallback");
        fallback_forecast(target)
    })
}

fn local_time<Z: TimeZone>(sample: &RawForecastSample, tz: &Z) -> Option<DateTime<Z>> {
    DateTime::from_timestamp(sample.timestamp_unix_seconds, 0).map(|utc| utc.with_timezone(tz))
}

fn precipitation_percent(probability: f64) -> f64 {
    if !probability.is_finite() {
        return 0.0;
    }
    (probability * 100.0).clamp(0.0, 100.0)
}
