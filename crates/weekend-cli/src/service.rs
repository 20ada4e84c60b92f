use std::thread;

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

use crate::config::{OPENWEATHER_API_KEY_ENV, RuntimeConfig};
use crate::extract::{extract_or_fallback, fallback_forecast};
use crate::locations::Location;
use crate::model::{LocationWeekendForecast, ReportStatus, WeekendReport};
use crate::providers::{ForecastApi, OpenWeatherProvider};
use crate::weekend::{WeekendDates, iso_date};

/// Builds the OpenWeatherMap provider from `config` and resolves the report.
/// Never fails: configuration and client problems degrade to an empty report.
pub fn fetch_weekend_report<N>(
    config: &RuntimeConfig,
    now_fn: N,
    locations: &[&'static Location],
) -> WeekendReport
where
    N: Fn() -> DateTime<Utc>,
{
    let context = ReportContext::new(config.timezone, now_fn());
    let Some(api_key) = config.api_key.as_deref() else {
        return context.missing_credential();
    };

    match OpenWeatherProvider::new(config, api_key) {
        Ok(provider) => resolve_report(context, &provider, locations),
        Err(error) => {
            tracing::error!(%error, "failed to initialize forecast provider");
            context.report(ReportStatus::Failed, Vec::new())
        }
    }
}

pub fn build_weekend_report<P, N>(
    config: &RuntimeConfig,
    provider: &P,
    now_fn: N,
    locations: &[&'static Location],
) -> WeekendReport
where
    P: ForecastApi,
    N: Fn() -> DateTime<Utc>,
{
    let context = ReportContext::new(config.timezone, now_fn());
    if config.api_key.is_none() {
        return context.missing_credential();
    }

    resolve_report(context, provider, locations)
}

/// One weekend forecast per location, in table order. Empty when no API key
/// is configured.
pub fn get_weekend_forecasts<P, N>(
    config: &RuntimeConfig,
    provider: &P,
    now_fn: N,
    locations: &[&'static Location],
) -> Vec<LocationWeekendForecast>
where
    P: ForecastApi,
    N: Fn() -> DateTime<Utc>,
{
    build_weekend_report(config, provider, now_fn, locations).forecasts
}

fn resolve_report<P: ForecastApi>(
    context: ReportContext,
    provider: &P,
    locations: &[&'static Location],
) -> WeekendReport {
    let forecasts = fan_out(provider, locations, context.dates, context.timezone);
    let fallback_days = forecasts
        .iter()
        .flat_map(|item| [&item.saturday, &item.sunday])
        .filter(|day| day.is_fallback())
        .count();
    tracing::info!(
        locations = forecasts.len(),
        fallback_days,
        saturday = %context.dates.saturday,
        "weekend forecasts resolved"
    );
    context.report(ReportStatus::Ready, forecasts)
}

fn fan_out<P: ForecastApi>(
    provider: &P,
    locations: &[&'static Location],
    dates: WeekendDates,
    tz: Tz,
) -> Vec<LocationWeekendForecast> {
    thread::scope(|scope| {
        let handles: Vec<_> = locations
            .iter()
            .map(|&location| scope.spawn(move || resolve_location(provider, location, dates, tz)))
            .collect();
        // Join every worker before inspecting results so no panic is left
        // for the scope to re-raise.
        let joined: Vec<_> = handles.into_iter().map(|handle| handle.join()).collect();

        joined
            .into_iter()
            .zip(locations)
            .map(|(result, &location)| {
                result.unwrap_or_else(|_| {
                    tracing::warn!(location = location.id, "forecast worker panicked, using fallback");
                    fallback_location(location, dates)
                })
            })
            .collect()
    })
}

fn resolve_location<P: ForecastApi>(
    provider: &P,
    location: &Location,
    dates: WeekendDates,
    tz: Tz,
) -> LocationWeekendForecast {
    match provider.fetch_forecast(location.latitude, location.longitude) {
        Ok(samples) => {
            tracing::debug!(location = location.id, samples = samples.len(), "forecast fetched");
            LocationWeekendForecast::new(
                location,
                extract_or_fallback(&samples, dates.saturday, &tz),
                extract_or_fallback(&samples, dates.sunday, &tz),
            )
        }
        Err(error) => {
            tracing::warn!(
                location = location.id,
                %error,
                "forecast request failed, using fallback"
            );
            fallback_location(location, dates)
        }
    }
}

fn fallback_location(location: &Location, dates: WeekendDates) -> LocationWeekendForecast {
    LocationWeekendForecast::new(
        location,
        fallback_forecast(dates.saturday),
        fallback_forecast(dates.sunday),
    )
}

#[derive(Debug, Clone, Copy)]
struct ReportContext {
    timezone: Tz,
    dates: WeekendDates,
    generated_at: DateTime<Utc>,
}

impl ReportContext {
    fn new(timezone: Tz, now: DateTime<Utc>) -> Self {
        Self {
            timezone,
            dates: WeekendDates::resolve(&now.with_timezone(&timezone)),
            generated_at: now,
        }
    }

    fn missing_credential(&self) -> WeekendReport {
        tracing::error!("{OPENWEATHER_API_KEY_ENV} is not set; no forecasts fetched");
        self.report(ReportStatus::MissingCredential, Vec::new())
    }

    fn report(&self, status: ReportStatus, forecasts: Vec<LocationWeekendForecast>) -> WeekendReport {
        WeekendReport {
            status,
            timezone: self.timezone.name().to_string(),
            saturday_date: iso_date(self.dates.saturday),
            sunday_date: iso_date(self.dates.sunday),
            generated_at: self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            forecasts,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{Duration, TimeZone, Timelike};
    use chrono_tz::Asia::Tokyo;

    use super::*;
    use crate::locations::{RACETRACKS, find, select_locations};
    use crate::model::{ForecastSource, RawForecastSample};
    use crate::providers::ProviderError;

    /// Serves a 5-day/3-hour series starting 2024-06-12 00:00 UTC. The sample
    /// temperature is its Tokyo-local hour so tests can see which one was
    /// picked.
    struct FakeProvider {
        failing_lat: Option<f64>,
        panicking_lat: Option<f64>,
        sample_count: usize,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn ok() -> Self {
            Self {
                failing_lat: None,
                panicking_lat: None,
                sample_count: 40,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ForecastApi for FakeProvider {
        fn fetch_forecast(
            &self,
            lat: f64,
            _lon: f64,
        ) -> Result<Vec<RawForecastSample>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.panicking_lat == Some(lat) {
                panic!("simulated worker crash");
            }
            if self.failing_lat == Some(lat) {
                return Err(ProviderError::Http {
                    status: 503,
                    message: "service unavailable".to_string(),
                });
            }

            let start = Utc
                .with_ymd_and_hms(2024, 6, 12, 0, 0, 0)
                .single()
                .expect("time");
            Ok((0..self.sample_count)
                .map(|step| {
                    let at = start + Duration::hours(3 * step as i64);
                    RawForecastSample {
                        timestamp_unix_seconds: at.timestamp(),
                        condition_text: format!("lat {lat:.4}"),
                        icon_code: "02d".to_string(),
                        temperature_celsius: f64::from(at.with_timezone(&Tokyo).hour()),
                        humidity_percent: 60,
                        wind_speed_mps: 2.5,
                        precipitation_probability: 0.2,
                    }
                })
                .collect())
        }
    }

    fn configured() -> RuntimeConfig {
        RuntimeConfig {
            api_key: Some("test-key".to_string()),
            ..RuntimeConfig::default()
        }
    }

    // Wednesday 2024-06-12, 12:00 in Tokyo.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, 3, 0, 0)
            .single()
            .expect("time")
    }

    fn all_locations() -> Vec<&'static Location> {
        select_locations(&[]).expect("locations")
    }

    #[test]
    fn service_resolves_every_location_from_provider_data() {
        let provider = FakeProvider::ok();
        let report = build_weekend_report(&configured(), &provider, fixed_now, &all_locations());

        assert_eq!(report.status, ReportStatus::Ready);
        assert_eq!(report.timezone, "Asia/Tokyo");
        assert_eq!(report.saturday_date, "2024-06-15");
        assert_eq!(report.sunday_date, "2024-06-16");
        assert_eq!(report.forecasts.len(), 10);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 10);

        for forecast in &report.forecasts {
            assert_eq!(forecast.saturday.date, "2024-06-15");
            assert_eq!(forecast.sunday.date, "2024-06-16");
            assert_eq!(forecast.saturday.source, ForecastSource::Provider);
            assert_eq!(forecast.saturday.temperature_celsius, 12.0);
            assert_eq!(forecast.sunday.temperature_celsius, 12.0);
            assert!((forecast.saturday.precipitation_percent - 20.0).abs() < 1e-9);
        }
    }

    #[test]
    fn service_preserves_table_order() {
        let forecasts = get_weekend_forecasts(
            &configured(),
            &FakeProvider::ok(),
            fixed_now,
            &all_locations(),
        );

        let ids: Vec<&str> = forecasts.iter().map(|f| f.location_id.as_str()).collect();
        let expected: Vec<&str> = RACETRACKS.iter().map(|location| location.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn service_isolates_single_location_failure() {
        let kyoto = find("kyoto").expect("kyoto");
        let provider = FakeProvider {
            failing_lat: Some(kyoto.latitude),
            ..FakeProvider::ok()
        };

        let forecasts =
            get_weekend_forecasts(&configured(), &provider, fixed_now, &all_locations());

        assert_eq!(forecasts.len(), 10);
        for forecast in &forecasts {
            if forecast.location_id == "kyoto" {
                let saturday = chrono::NaiveDate::from_ymd_opt(2024, 6, 15).expect("date");
                let sunday = chrono::NaiveDate::from_ymd_opt(2024, 6, 16).expect("date");
                assert_eq!(forecast.saturday, fallback_forecast(saturday));
                assert_eq!(forecast.sunday, fallback_forecast(sunday));
                assert_eq!(forecast.display_name, "京都競馬場");
            } else {
                assert!(!forecast.saturday.is_fallback(), "{}", forecast.location_id);
                assert!(!forecast.sunday.is_fallback(), "{}", forecast.location_id);
            }
        }
    }

    #[test]
    fn service_falls_back_per_day_when_series_ends_early() {
        // 32 samples end at 2024-06-15 21:00 UTC, 06:00 on Sunday in Tokyo,
        // so Sunday only has early-morning samples.
        let provider = FakeProvider {
            sample_count: 32,
            ..FakeProvider::ok()
        };

        let forecasts = get_weekend_forecasts(
            &configured(),
            &provider,
            fixed_now,
            &[find("tokyo").expect("tokyo")],
        );

        assert_eq!(forecasts.len(), 1);
        assert_eq!(forecasts[0].saturday.temperature_celsius, 12.0);
        assert!(!forecasts[0].sunday.is_fallback());
        assert_eq!(forecasts[0].sunday.temperature_celsius, 6.0);

        // 29 samples stop at Saturday 21:00 in Tokyo.
        let short = FakeProvider {
            sample_count: 29,
            ..FakeProvider::ok()
        };
        let forecasts = get_weekend_forecasts(
            &configured(),
            &short,
            fixed_now,
            &[find("tokyo").expect("tokyo")],
        );
        assert!(!forecasts[0].saturday.is_fallback());
        assert!(forecasts[0].sunday.is_fallback());
    }

    #[test]
    fn service_returns_empty_without_credential() {
        let provider = FakeProvider::ok();
        let report = build_weekend_report(
            &RuntimeConfig::default(),
            &provider,
            fixed_now,
            &all_locations(),
        );

        assert_eq!(report.status, ReportStatus::MissingCredential);
        assert!(report.forecasts.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fetch_report_without_credential_skips_network() {
        let report = fetch_weekend_report(&RuntimeConfig::default(), fixed_now, &all_locations());

        assert_eq!(report.status, ReportStatus::MissingCredential);
        assert!(report.forecasts.is_empty());
        assert_eq!(report.saturday_date, "2024-06-15");
    }

    #[test]
    fn service_isolates_a_panicking_worker_to_its_location() {
        let hanshin = find("hanshin").expect("hanshin");
        let provider = FakeProvider {
            panicking_lat: Some(hanshin.latitude),
            ..FakeProvider::ok()
        };

        let report = build_weekend_report(&configured(), &provider, fixed_now, &all_locations());

        assert_eq!(report.status, ReportStatus::Ready);
        assert_eq!(report.forecasts.len(), 10);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 10);
        for forecast in &report.forecasts {
            let expected = if forecast.location_id == "hanshin" {
                ForecastSource::Fallback
            } else {
                ForecastSource::Provider
            };
            assert_eq!(forecast.saturday.source, expected, "{}", forecast.location_id);
            assert_eq!(forecast.sunday.source, expected, "{}", forecast.location_id);
        }
        let hanshin_forecast = &report.forecasts[3];
        assert_eq!(hanshin_forecast.location_id, "hanshin");
        assert_eq!(hanshin_forecast.saturday.date, "2024-06-15");
        assert_eq!(hanshin_forecast.sunday.date, "2024-06-16");
    }

    #[test]
    fn fetch_reads_the_clock_once() {
        let reads = Cell::new(0);
        let now = || {
            reads.set(reads.get() + 1);
            fixed_now()
        };

        let report = fetch_weekend_report(&configured(), now, &[]);

        assert_eq!(report.status, ReportStatus::Ready);
        assert_eq!(report.generated_at, "2024-06-12T03:00:00Z");
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn service_targets_dates_in_configured_zone() {
        let config = RuntimeConfig {
            timezone: chrono_tz::UTC,
            ..configured()
        };
        // Friday 20:00 UTC is Saturday morning in Tokyo but still Friday in UTC.
        let now = || {
            Utc.with_ymd_and_hms(2024, 6, 14, 20, 0, 0)
                .single()
                .expect("time")
        };

        let utc_report = build_weekend_report(&config, &FakeProvider::ok(), now, &[]);
        let tokyo_report = build_weekend_report(&configured(), &FakeProvider::ok(), now, &[]);

        assert_eq!(utc_report.saturday_date, "2024-06-15");
        assert_eq!(tokyo_report.saturday_date, "2024-06-22");
        assert_eq!(utc_report.timezone, "UTC");
    }
}
