// OpenWeatherMap icon codes are a two-digit condition group plus a `d`/`n`
// day-night suffix, e.g. `10d`.

fn condition_group(code: &str) -> &str {
    code.trim().get(..2).unwrap_or("")
}

pub fn glyph(code: &str) -> &'static str {
    match condition_group(code) {
        "01" => "☀",
        "02" => "🌤",
        "03" | "04" => "☁",
        "09" => "🌧",
        "10" => "🌦",
        "11" => "⛈",
        "13" => "❄",
        "50" => "🌫",
        _ => "?",
    }
}

pub fn summary_en(code: &str) -> &'static str {
    match condition_group(code) {
        "01" => "Clear sky",
        "02" => "Few clouds",
        "03" => "Scattered clouds",
        "04" => "Broken clouds",
        "09" => "Shower rain",
        "10" => "Rain",
        "11" => "Thunderstorm",
        "13" => "Snow",
        "50" => "Mist",
        _ => "Unknown",
    }
}
