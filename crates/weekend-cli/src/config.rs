use std::collections::HashMap;

use chrono_tz::Tz;

pub const OPENWEATHER_API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
const LEGACY_API_KEY_ENV: &str = "NEXT_PUBLIC_OPENWEATHER_API_KEY";
pub const WEEKEND_TIMEZONE_ENV: &str = "WEEKEND_TIMEZONE";
pub const WEEKEND_FORECAST_LANG_ENV: &str = "WEEKEND_FORECAST_LANG";
pub const WEEKEND_HTTP_TIMEOUT_SECS_ENV: &str = "WEEKEND_HTTP_TIMEOUT_SECS";

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Tokyo;
pub const DEFAULT_FORECAST_LANG: &str = "ja";
pub const PROVIDER_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub api_key: Option<String>,
    /// Zone used for both weekend date targeting and sample bucketing.
    pub timezone: Tz,
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            timezone: DEFAULT_TIMEZONE,
            language: DEFAULT_FORECAST_LANG.to_string(),
            timeout_secs: PROVIDER_TIMEOUT_SECS,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    pub(crate) fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            api_key: resolve_api_key(&map),
            timezone: resolve_timezone(&map),
            language: resolve_language(&map),
            timeout_secs: resolve_timeout_secs(&map),
        }
    }
}

fn non_blank<'a>(env_map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env_map
        .get(key)
        .map(String::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn resolve_api_key(env_map: &HashMap<String, String>) -> Option<String> {
    non_blank(env_map, OPENWEATHER_API_KEY_ENV)
        .or_else(|| non_blank(env_map, LEGACY_API_KEY_ENV))
        .map(str::to_string)
}

fn resolve_timezone(env_map: &HashMap<String, String>) -> Tz {
    let Some(raw) = non_blank(env_map, WEEKEND_TIMEZONE_ENV) else {
        return DEFAULT_TIMEZONE;
    };

    raw.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!(
            value = raw,
            "unknown {WEEKEND_TIMEZONE_ENV}, using {DEFAULT_TIMEZONE}"
        );
        DEFAULT_TIMEZONE
    })
}

fn resolve_language(env_map: &HashMap<String, String>) -> String {
    non_blank(env_map, WEEKEND_FORECAST_LANG_ENV)
        .unwrap_or(DEFAULT_FORECAST_LANG)
        .to_string()
}

fn resolve_timeout_secs(env_map: &HashMap<String, String>) -> u64 {
    non_blank(env_map, WEEKEND_HTTP_TIMEOUT_SECS_ENV)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(PROVIDER_TIMEOUT_SECS)
}
