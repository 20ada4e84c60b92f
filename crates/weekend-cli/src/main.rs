use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use weekend_cli::{
    config::{OPENWEATHER_API_KEY_ENV, RuntimeConfig},
    error::{AppError, ErrorKind},
    icon,
    locations::{self, Location, RACETRACKS},
    model::{DailyForecast, LocationWeekendForecast, ReportStatus, WeekendReport},
    service,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Weekend noon forecasts for the JRA racetracks (OpenWeatherMap)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Saturday and Sunday forecast nearest to noon for each racetrack.
    Forecast {
        /// Racetrack id (repeatable); defaults to all racetracks.
        #[arg(long = "location")]
        locations: Vec<String>,
        #[arg(long, value_enum)]
        output: Option<OutputModeArg>,
        #[arg(long)]
        json: bool,
        #[arg(long, value_enum)]
        lang: Option<LanguageArg>,
    },
    /// List the configured racetracks.
    Locations {
        #[arg(long)]
        json: bool,
    },
}

const ENVELOPE_SCHEMA_VERSION: &str = "v1";
const ERROR_CODE_USER_INVALID_INPUT: &str = "user.invalid_input";
const ERROR_CODE_USER_OUTPUT_MODE_CONFLICT: &str = "user.output_mode_conflict";
const ERROR_CODE_RUNTIME_SERIALIZE: &str = "runtime.serialize_failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputModeArg {
    Human,
    Json,
    AlfredJson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliOutputMode {
    Human,
    Json,
    AlfredJson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LanguageArg {
    Ja,
    En,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputLanguage {
    Ja,
    En,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliError {
    kind: ErrorKind,
    code: &'static str,
    message: String,
}

impl CliError {
    fn user(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::User,
            code,
            message: message.into(),
        }
    }

    fn runtime(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            code,
            message: message.into(),
        }
    }

    fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::User => 2,
            ErrorKind::Runtime => 1,
        }
    }
}

impl From<AppError> for CliError {
    fn from(error: AppError) -> Self {
        CliError::user(ERROR_CODE_USER_INVALID_INPUT, error.message)
    }
}

impl From<OutputModeArg> for CliOutputMode {
    fn from(value: OutputModeArg) -> Self {
        match value {
            OutputModeArg::Human => CliOutputMode::Human,
            OutputModeArg::Json => CliOutputMode::Json,
            OutputModeArg::AlfredJson => CliOutputMode::AlfredJson,
        }
    }
}

impl From<LanguageArg> for OutputLanguage {
    fn from(value: LanguageArg) -> Self {
        match value {
            LanguageArg::Ja => OutputLanguage::Ja,
            LanguageArg::En => OutputLanguage::En,
        }
    }
}

impl Cli {
    fn command_name(&self) -> &'static str {
        match &self.command {
            Commands::Forecast { .. } => "weekend.forecast",
            Commands::Locations { .. } => "weekend.locations",
        }
    }

    fn output_mode_hint(&self) -> CliOutputMode {
        match &self.command {
            Commands::Forecast { output, json, .. } => {
                if *json {
                    CliOutputMode::Json
                } else if let Some(explicit) = output {
                    (*explicit).into()
                } else {
                    CliOutputMode::Human
                }
            }
            Commands::Locations { json } => {
                if *json {
                    CliOutputMode::Json
                } else {
                    CliOutputMode::Human
                }
            }
        }
    }
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let command = cli.command_name();
    let output_mode = cli.output_mode_hint();
    let config = RuntimeConfig::from_env();
    let fetch = |config: &RuntimeConfig, selected: &[&'static Location]| {
        service::fetch_weekend_report(config, Utc::now, selected)
    };

    match run_with(cli, &config, fetch) {
        Ok(output) => println!("{output}"),
        Err(error) => {
            emit_error(command, output_mode, &error);
            std::process::exit(error.exit_code());
        }
    }
}

// Logs go to stderr so stdout stays parseable in JSON modes.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_with<F>(cli: Cli, config: &RuntimeConfig, fetch: F) -> Result<String, CliError>
where
    F: FnOnce(&RuntimeConfig, &[&'static Location]) -> WeekendReport,
{
    match cli.command {
        Commands::Forecast {
            locations: ids,
            output,
            json,
            lang,
        } => {
            let output_mode = resolve_output_mode(output, json, CliOutputMode::Human)?;
            let language = lang
                .map(Into::into)
                .unwrap_or_else(|| default_language(config));
            let selected = locations::select_locations(&ids).map_err(AppError::from)?;
            let report = fetch(config, &selected);

            match output_mode {
                CliOutputMode::Json => render_json_envelope("weekend.forecast", &report),
                CliOutputMode::Human => Ok(format_text_output(&report, language)),
                CliOutputMode::AlfredJson => render_alfred_json(&report, language),
            }
        }
        Commands::Locations { json } => {
            if json {
                render_json_envelope("weekend.locations", &RACETRACKS)
            } else {
                Ok(format_locations(&RACETRACKS))
            }
        }
    }
}

fn default_language(config: &RuntimeConfig) -> OutputLanguage {
    if config.language.to_ascii_lowercase().starts_with("en") {
        OutputLanguage::En
    } else {
        OutputLanguage::Ja
    }
}

fn resolve_output_mode(
    output: Option<OutputModeArg>,
    json_flag: bool,
    default_mode: CliOutputMode,
) -> Result<CliOutputMode, CliError> {
    match (output.map(Into::into), json_flag) {
        (Some(mode), true) if mode != CliOutputMode::Json => Err(CliError::user(
            ERROR_CODE_USER_OUTPUT_MODE_CONFLICT,
            format!(
                "conflicting output flags: --json requires --output json (got {})",
                output_mode_label(mode)
            ),
        )),
        (Some(mode), _) => Ok(mode),
        (None, true) => Ok(CliOutputMode::Json),
        (None, false) => Ok(default_mode),
    }
}

fn render_json_envelope<T: serde::Serialize>(command: &str, result: &T) -> Result<String, CliError> {
    let result = serde_json::to_value(result).map_err(|error| {
        CliError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize output: {error}"),
        )
    })?;
    serde_json::to_string(&json!({
        "schema_version": ENVELOPE_SCHEMA_VERSION,
        "command": command,
        "ok": true,
        "result": result,
    }))
    .map_err(|error| {
        CliError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize output envelope: {error}"),
        )
    })
}

fn render_alfred_json(report: &WeekendReport, language: OutputLanguage) -> Result<String, CliError> {
    let mut items = Vec::with_capacity(report.forecasts.len() * 2 + 1);

    if let Some(notice) = degraded_notice(report.status, language) {
        items.push(json!({
            "title": notice,
            "subtitle": format!("{} / {}", report.saturday_date, report.sunday_date),
            "valid": false,
        }));
    }

    for forecast in &report.forecasts {
        for (label, day) in weekend_tabs(forecast, language) {
            items.push(json!({
                "title": format!(
                    "{} {} {} {:.1}°C",
                    forecast.display_name,
                    label,
                    condition_label(day, language),
                    day.temperature_celsius
                ),
                "subtitle": format!("{} | {}", day.date, detail_line(day, language)),
                "arg": forecast.location_id,
                "valid": false,
            }));
        }
    }

    serde_json::to_string(&json!({ "items": items })).map_err(|error| {
        CliError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize Alfred output: {error}"),
        )
    })
}

fn emit_error(command: &str, output_mode: CliOutputMode, error: &CliError) {
    match output_mode {
        CliOutputMode::Json => {
            let payload = json!({
                "schema_version": ENVELOPE_SCHEMA_VERSION,
                "command": command,
                "ok": false,
                "error": {
                    "code": error.code,
                    "message": error.message,
                    "details": {
                        "kind": error_kind_label(error.kind),
                        "exit_code": error.exit_code(),
                    }
                }
            });
            let rendered = serde_json::to_string(&payload).unwrap_or_else(|_| {
                format!(
                    "{{\"schema_version\":\"{ENVELOPE_SCHEMA_VERSION}\",\"command\":\"{command}\",\"ok\":false,\"error\":{{\"code\":\"{ERROR_CODE_RUNTIME_SERIALIZE}\"}}}}"
                )
            });
            println!("{rendered}");
        }
        CliOutputMode::AlfredJson => {
            let payload = json!({
                "items": [{
                    "title": format!("Error [{}]", error.code),
                    "subtitle": error.message,
                    "valid": false
                }]
            });
            let rendered = serde_json::to_string(&payload).unwrap_or_else(|_| {
                "{\"items\":[{\"title\":\"Error\",\"subtitle\":\"failed to serialize error output\",\"valid\":false}]}".to_string()
            });
            println!("{rendered}");
        }
        CliOutputMode::Human => {
            eprintln!("error[{}]: {}", error.code, error.message);
        }
    }
}

fn error_kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::User => "user",
        ErrorKind::Runtime => "runtime",
    }
}

fn output_mode_label(mode: CliOutputMode) -> &'static str {
    match mode {
        CliOutputMode::Human => "human",
        CliOutputMode::Json => "json",
        CliOutputMode::AlfredJson => "alfred-json",
    }
}

fn format_text_output(report: &WeekendReport, language: OutputLanguage) -> String {
    let mut lines = vec![format!(
        "{} {} / {} ({})",
        heading_label(language),
        report.saturday_date,
        report.sunday_date,
        report.timezone
    )];

    if let Some(notice) = degraded_notice(report.status, language) {
        lines.push(notice);
        return lines.join("\n");
    }

    for forecast in &report.forecasts {
        lines.push(String::new());
        lines.push(format!("{} ({})", forecast.display_name, forecast.region));
        for (label, day) in weekend_tabs(forecast, language) {
            lines.push(format!(
                "  {} {}  {} {} {:.1}°C  {}",
                label,
                day.date,
                icon::glyph(&day.icon_code),
                condition_label(day, language),
                day.temperature_celsius,
                detail_line(day, language)
            ));
        }
    }

    lines.join("\n")
}

fn format_locations(table: &[Location]) -> String {
    table
        .iter()
        .map(|location| {
            format!(
                "{:<10} {} ({}) {:.4},{:.4}",
                location.id,
                location.display_name,
                location.region,
                location.latitude,
                location.longitude
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn weekend_tabs(
    forecast: &LocationWeekendForecast,
    language: OutputLanguage,
) -> [(&'static str, &DailyForecast); 2] {
    match language {
        OutputLanguage::Ja => [("土", &forecast.saturday), ("日", &forecast.sunday)],
        OutputLanguage::En => [("Sat", &forecast.saturday), ("Sun", &forecast.sunday)],
    }
}

fn condition_label(day: &DailyForecast, language: OutputLanguage) -> String {
    match language {
        OutputLanguage::Ja => day.condition_text.clone(),
        OutputLanguage::En if day.is_fallback() => "No data".to_string(),
        OutputLanguage::En => icon::summary_en(&day.icon_code).to_string(),
    }
}

fn detail_line(day: &DailyForecast, language: OutputLanguage) -> String {
    let (humidity, wind, rain) = match language {
        OutputLanguage::Ja => ("湿度", "風速", "降水確率"),
        OutputLanguage::En => ("humidity", "wind", "rain"),
    };
    format!(
        "{humidity} {}%  {wind} {:.1} m/s  {rain} {:.0}%",
        day.humidity_percent, day.wind_speed_mps, day.precipitation_percent
    )
}

fn heading_label(language: OutputLanguage) -> &'static str {
    match language {
        OutputLanguage::Ja => "週末の天気予報",
        OutputLanguage::En => "Weekend forecast",
    }
}

fn degraded_notice(status: ReportStatus, language: OutputLanguage) -> Option<String> {
    match (status, language) {
        (ReportStatus::Ready, _) => None,
        (ReportStatus::MissingCredential, OutputLanguage::Ja) => Some(format!(
            "天気データを取得できません: {OPENWEATHER_API_KEY_ENV} が設定されていません"
        )),
        (ReportStatus::MissingCredential, OutputLanguage::En) => Some(format!(
            "No forecasts: set {OPENWEATHER_API_KEY_ENV} to fetch weekend weather"
        )),
        (ReportStatus::Failed, OutputLanguage::Ja) => {
            Some("天気データの取得に失敗しました".to_string())
        }
        (ReportStatus::Failed, OutputLanguage::En) => {
            Some("No forecasts: weather data could not be fetched".to_string())
        }
    }
}
