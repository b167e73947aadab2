//! Weather specialist. Replies are formatted locally from the tool data;
//! the classifier is only consulted to pull out the location and request type.

use serde::Deserialize;
use serde_json::Value;

use super::{is_blank, query_block};
use crate::classify::{lenient_string, lenient_u32, Classifier, ParsedReply};
use crate::models::{HandlerResult, QueryContext};
use crate::tools::{ToolOutcome, WeatherTools, MAX_FORECAST_DAYS};

const ASK_FOR_LOCATION_TEXT: &str = "I'd be happy to provide weather information! Please specify which location you'd like weather for.

I can provide:
• Current weather conditions
• Weather forecasts (up to 5 days)

Examples:
• \"Weather in London\"
• \"New York weather forecast\"
• \"5 day forecast for Tokyo\"

Which location would you like weather information for?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestType {
    Current,
    Forecast,
}

#[derive(Debug, Default, Deserialize)]
struct WeatherIntent {
    #[serde(default, deserialize_with = "lenient_string")]
    location: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    request_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    forecast_days: Option<u32>,
}

impl WeatherIntent {
    fn request_type(&self) -> RequestType {
        match self.request_type.as_deref().map(str::to_lowercase).as_deref() {
            Some("forecast") => RequestType::Forecast,
            _ => RequestType::Current,
        }
    }
}

pub struct WeatherHandler {
    classifier: Classifier,
    tools: WeatherTools,
}

impl WeatherHandler {
    pub const NAME: &'static str = "Weather Agent";
    pub const DESCRIPTION: &'static str = "Provides current weather information and forecasts";

    pub fn new(classifier: Classifier, tools: WeatherTools) -> Self {
        Self { classifier, tools }
    }

    pub fn tools(&self) -> &WeatherTools {
        &self.tools
    }

    /// Clarification reply for queries that name no place.
    pub fn ask_for_location() -> HandlerResult {
        HandlerResult::static_reply(Self::NAME, ASK_FOR_LOCATION_TEXT)
    }

    pub async fn process(&self, query: &str, context: &QueryContext) -> HandlerResult {
        if is_blank(query) {
            return Self::ask_for_location();
        }

        let intent = match self
            .classifier
            .classify::<WeatherIntent>(&analysis_prompt(query, context))
            .await
        {
            ParsedReply::Parsed(intent) => intent,
            ParsedReply::Unparseable => {
                tracing::warn!("[{}] Unparseable classification, asking for location", Self::NAME);
                return Self::ask_for_location();
            }
        };

        let Some(location) = intent.location.clone() else {
            return Self::ask_for_location();
        };

        match intent.request_type() {
            RequestType::Forecast => {
                let days = intent.forecast_days.unwrap_or(MAX_FORECAST_DAYS);
                let outcome = self.tools.get_weather_forecast(&location, days).await;
                let reply = format_forecast(&outcome, &location);
                HandlerResult::from_outcome(Self::NAME, reply, outcome)
            }
            RequestType::Current => {
                let outcome = self.tools.get_weather(&location).await;
                let reply = format_current(&outcome, &location);
                HandlerResult::from_outcome(Self::NAME, reply, outcome)
            }
        }
    }
}

fn analysis_prompt(query: &str, context: &QueryContext) -> String {
    format!(
        r#"Analyze this weather query and extract information:
{}

Determine:
1. Location mentioned
2. Type of weather request (current weather or forecast)
3. Number of days for forecast (if applicable)

Common patterns:
- "weather in [location]" = current weather
- "forecast for [location]" = weather forecast
- "[number] day forecast" = specific forecast days

Respond in JSON format:
{{
    "location": "extracted_location_or_null",
    "request_type": "current_weather|forecast",
    "forecast_days": 5,
    "confidence": 0.95
}}"#,
        query_block(query, context)
    )
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A field worth printing: present, non-null, and not zero.
fn present<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    data.get(key).filter(|v| match v {
        Value::Null => false,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

pub fn format_current(outcome: &ToolOutcome, location: &str) -> String {
    let Some(data) = outcome.data() else {
        let message = outcome
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| format!("I couldn't find weather information for {}.", location));
        return format!(
            "{}\n\nPlease try again with a different location or check the spelling.",
            message
        );
    };

    let place = data.get("location").map(text).unwrap_or_else(|| location.to_string());
    let mut header = format!("Location: {}", place);
    if let Some(country) = present(data, "country") {
        header.push_str(&format!(", {}", text(country)));
    }

    let mut lines = vec![header];
    if let Some(temperature) = data.get("temperature") {
        lines.push(format!("Temperature: {}°C", text(temperature)));
    }
    if let Some(condition) = data.get("condition") {
        lines.push(format!("Condition: {}", text(condition)));
    }
    if let Some(feels_like) = present(data, "feels_like") {
        lines.push(format!("Feels like: {}°C", text(feels_like)));
    }
    if let Some(humidity) = data.get("humidity") {
        lines.push(format!("Humidity: {}%", text(humidity)));
    }
    if let Some(pressure) = present(data, "pressure") {
        lines.push(format!("Pressure: {} hPa", text(pressure)));
    }
    if let Some(wind) = present(data, "wind_speed") {
        lines.push(format!("Wind Speed: {} m/s", text(wind)));
    }
    if let Some(visibility) = present(data, "visibility") {
        lines.push(format!("Visibility: {} km", text(visibility)));
    }

    let mut reply = format!(
        "Here's the current weather for {}:\n\n{}",
        place,
        lines.join("\n")
    );
    if let Some(note) = present(data, "note") {
        reply.push_str(&format!("\n\nNote: {}", text(note)));
    }
    reply.push_str("\n\nWould you like a weather forecast or weather for another location?");
    reply
}

pub fn format_forecast(outcome: &ToolOutcome, location: &str) -> String {
    let Some(data) = outcome.data() else {
        return outcome
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| format!("I couldn't get forecast information for {}.", location));
    };

    let place = data.get("location").map(text).unwrap_or_else(|| location.to_string());
    let country = data.get("country").map(text).unwrap_or_default();
    let mut parts = vec![format!("Here's the weather forecast for {}, {}:\n", place, country)];

    let days = data
        .get("forecasts")
        .and_then(|f| f.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();
    for (i, day) in days.iter().enumerate() {
        let field = |key: &str| day.get(key).map(text).unwrap_or_default();
        parts.push(format!("Day {} ({}):", i + 1, field("date")));
        parts.push(format!(
            "   Temperature: {}°C - {}°C",
            field("temperature_min"),
            field("temperature_max")
        ));
        parts.push(format!("   Condition: {}", field("condition")));
        parts.push(format!("   Humidity: {}%", field("humidity")));
        if let Some(wind) = present(day, "wind_speed") {
            parts.push(format!("   Wind: {} m/s", text(wind)));
        }
        parts.push(String::new());
    }

    let mut reply = parts.join("\n");
    reply.push_str("Need weather for another location or different dates?");
    reply
}
