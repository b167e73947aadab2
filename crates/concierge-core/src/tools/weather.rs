//! Weather lookups against an OpenWeatherMap-compatible source.
//!
//! Without an API key, current conditions come from a small mock table and
//! forecasts are unavailable. The forecast endpoint serves 3-hour entries;
//! a request for `days` asks for `min(days * 8, 40)` entries and collapses
//! them into per-date buckets.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use super::ToolOutcome;
use crate::config::WeatherConfig;

/// Longest forecast the upstream source can serve.
pub const MAX_FORECAST_DAYS: u32 = 5;
const ENTRIES_PER_DAY: u32 = 8;
const MAX_FORECAST_ENTRIES: u32 = 40;

/// Clamp a requested forecast length to `1..=MAX_FORECAST_DAYS`.
pub fn clamp_forecast_days(days: u32) -> u32 {
    days.clamp(1, MAX_FORECAST_DAYS)
}

/// Number of raw 3-hour entries requested for a forecast of `days` days.
pub fn forecast_entry_count(days: u32) -> u32 {
    (days * ENTRIES_PER_DAY).min(MAX_FORECAST_ENTRIES)
}

struct MockWeather {
    temperature: i64,
    condition: &'static str,
    humidity: i64,
}

pub struct WeatherTools {
    client: reqwest::Client,
    config: WeatherConfig,
    mock: HashMap<&'static str, MockWeather>,
}

impl WeatherTools {
    pub fn new(config: WeatherConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let mock = HashMap::from([
            (
                "new york",
                MockWeather {
                    temperature: 22,
                    condition: "sunny",
                    humidity: 45,
                },
            ),
            (
                "london",
                MockWeather {
                    temperature: 15,
                    condition: "cloudy",
                    humidity: 70,
                },
            ),
            (
                "tokyo",
                MockWeather {
                    temperature: 28,
                    condition: "rainy",
                    humidity: 80,
                },
            ),
        ]);

        Self {
            client,
            config,
            mock,
        }
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub async fn get_weather(&self, location: &str) -> ToolOutcome {
        let Some(api_key) = self.api_key() else {
            return self.mock_weather(location);
        };

        tracing::info!("[WeatherTools] Fetching current weather for '{}'", location);

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("q", location), ("appid", api_key), ("units", "metric")])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return request_failure(&e),
        };

        match response.status().as_u16() {
            200 => match response.json::<Value>().await {
                Ok(body) => current_from_api(&body),
                Err(e) => ToolOutcome::failure(format!("Weather service error: {}", e)),
            },
            404 => ToolOutcome::failure(format!(
                "Location '{}' not found. Please check the spelling and try again.",
                location
            )),
            401 => ToolOutcome::failure(
                "Invalid API key. Please check your OpenWeatherMap API configuration.",
            ),
            status => ToolOutcome::failure(format!("Weather service error: {}", status)),
        }
    }

    /// Forecast for `days` days; `days` is clamped to `1..=5`.
    pub async fn get_weather_forecast(&self, location: &str, days: u32) -> ToolOutcome {
        let Some(api_key) = self.api_key() else {
            return ToolOutcome::failure(
                "Weather forecast requires OpenWeatherMap API key. Please add OPENWEATHERMAP_API_KEY to .env",
            );
        };

        let days = clamp_forecast_days(days);
        let count = forecast_entry_count(days).to_string();

        tracing::info!(
            "[WeatherTools] Fetching {}-day forecast for '{}' ({} entries)",
            days,
            location,
            count
        );

        let response = self
            .client
            .get(&self.config.forecast_url)
            .query(&[
                ("q", location),
                ("appid", api_key),
                ("units", "metric"),
                ("cnt", count.as_str()),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return ToolOutcome::failure(format!("Forecast service error: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            return ToolOutcome::failure(format!("Forecast service error: {}", status.as_u16()));
        }

        match response.json::<Value>().await {
            Ok(body) => collapse_forecast(&body, days),
            Err(e) => ToolOutcome::failure(format!("Forecast service error: {}", e)),
        }
    }

    fn mock_weather(&self, location: &str) -> ToolOutcome {
        match self.mock.get(location.trim().to_lowercase().as_str()) {
            Some(weather) => ToolOutcome::success(serde_json::json!({
                "location": title_case(location.trim()),
                "temperature": weather.temperature,
                "condition": title_case(weather.condition),
                "humidity": weather.humidity,
                "note": "Using mock data - Please add OPENWEATHERMAP_API_KEY to .env for real weather data",
            })),
            None => ToolOutcome::failure(format!(
                "Weather data not available for {}. Please add OPENWEATHERMAP_API_KEY to .env for real weather data.",
                location
            )),
        }
    }
}

fn request_failure(err: &reqwest::Error) -> ToolOutcome {
    if err.is_timeout() {
        ToolOutcome::failure("Weather service timeout. Please try again later.")
    } else if err.is_connect() {
        ToolOutcome::failure(
            "Unable to connect to weather service. Please check your internet connection.",
        )
    } else {
        ToolOutcome::failure(format!("Weather service error: {}", err))
    }
}

fn field<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Value, String> {
    let mut current = value;
    for key in path {
        current = current
            .get(*key)
            .filter(|v| !v.is_null())
            .ok_or_else(|| path.join("."))?;
    }
    Ok(current)
}

fn number(value: &Value, path: &[&str]) -> Result<f64, String> {
    field(value, path)?.as_f64().ok_or_else(|| path.join("."))
}

fn first_description(entry: &Value) -> Result<String, String> {
    entry
        .get("weather")
        .and_then(|w| w.get(0))
        .and_then(|w| w.get("description"))
        .and_then(|d| d.as_str())
        .map(title_case)
        .ok_or_else(|| "weather.0.description".to_string())
}

/// Map a current-weather API body to the flat shape handlers render.
pub fn current_from_api(body: &Value) -> ToolOutcome {
    let parsed = (|| -> Result<Value, String> {
        let visibility_km = body
            .get("visibility")
            .and_then(|v| v.as_f64())
            .filter(|v| *v > 0.0)
            .map(|v| v / 1000.0);

        Ok(serde_json::json!({
            "location": field(body, &["name"])?,
            "country": field(body, &["sys", "country"])?,
            "temperature": number(body, &["main", "temp"])?.round() as i64,
            "feels_like": number(body, &["main", "feels_like"])?.round() as i64,
            "condition": first_description(body)?,
            "humidity": field(body, &["main", "humidity"])?,
            "pressure": field(body, &["main", "pressure"])?,
            "wind_speed": body.pointer("/wind/speed").and_then(|v| v.as_f64()).unwrap_or(0.0),
            "visibility": visibility_km,
            "sunrise": field(body, &["sys", "sunrise"])?,
            "sunset": field(body, &["sys", "sunset"])?,
        }))
    })();

    match parsed {
        Ok(data) => ToolOutcome::success(data),
        Err(missing) => ToolOutcome::failure(format!(
            "Error parsing weather data: missing field {}",
            missing
        )),
    }
}

/// Collapse raw 3-hour forecast entries into at most `days` calendar buckets.
///
/// Each bucket keeps the min/max temperature over its entries and the
/// condition, humidity and wind speed of the first entry of that date.
pub fn collapse_forecast(body: &Value, days: u32) -> ToolOutcome {
    let parsed = (|| -> Result<Value, String> {
        let entries = field(body, &["list"])?
            .as_array()
            .ok_or_else(|| "list".to_string())?;

        let mut buckets: Vec<serde_json::Map<String, Value>> = Vec::new();
        let mut temps: Vec<(f64, f64)> = Vec::new();

        for entry in entries {
            let date = field(entry, &["dt_txt"])?
                .as_str()
                .and_then(|s| s.split_whitespace().next())
                .ok_or_else(|| "dt_txt".to_string())?
                .to_string();
            let temp = number(entry, &["main", "temp"])?;

            let same_day = buckets
                .last()
                .and_then(|b| b.get("date"))
                .and_then(|d| d.as_str())
                == Some(date.as_str());

            if same_day {
                if let Some((min, max)) = temps.last_mut() {
                    *min = min.min(temp);
                    *max = max.max(temp);
                }
                continue;
            }

            let mut bucket = serde_json::Map::new();
            bucket.insert("date".to_string(), Value::String(date));
            bucket.insert("condition".to_string(), Value::String(first_description(entry)?));
            bucket.insert("humidity".to_string(), field(entry, &["main", "humidity"])?.clone());
            bucket.insert(
                "wind_speed".to_string(),
                serde_json::json!(entry.pointer("/wind/speed").and_then(|v| v.as_f64()).unwrap_or(0.0)),
            );
            buckets.push(bucket);
            temps.push((temp, temp));
        }

        let forecasts: Vec<Value> = buckets
            .into_iter()
            .zip(temps)
            .take(days as usize)
            .map(|(mut bucket, (min, max))| {
                bucket.insert("temperature_min".to_string(), serde_json::json!(min.round() as i64));
                bucket.insert("temperature_max".to_string(), serde_json::json!(max.round() as i64));
                Value::Object(bucket)
            })
            .collect();

        Ok(serde_json::json!({
            "location": field(body, &["city", "name"])?,
            "country": field(body, &["city", "country"])?,
            "forecasts": forecasts,
        }))
    })();

    match parsed {
        Ok(data) => ToolOutcome::success(data),
        Err(missing) => ToolOutcome::failure(format!(
            "Error parsing forecast data: missing field {}",
            missing
        )),
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
