//! Runtime configuration: classifier endpoint, weather source, workflow templates.
//!
//! Configuration can be read from the environment or from a YAML file:
//!
//! ```yaml
//! classifier:
//!   base_url: "https://api.groq.com/openai/v1"
//!   api_key: "${GROQ_API_KEY}"
//!   model: "llama3-8b-8192"
//!   timeout_secs: 20
//!
//! weather:
//!   api_key: "${OPENWEATHERMAP_API_KEY:-}"
//!
//! workflows:
//!   template_dir: "workflows"
//! ```
//!
//! String values support `${ENV_VAR}` and `${ENV_VAR:-default}` references.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConciergeError, ConciergeResult};

pub const DEFAULT_CLASSIFIER_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_CLASSIFIER_MODEL: &str = "llama3-8b-8192";
pub const DEFAULT_WEATHER_URL: &str = "http://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_FORECAST_URL: &str = "http://api.openweathermap.org/data/2.5/forecast";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConciergeConfig {
    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub workflows: WorkflowConfig,
}

/// Text-completion endpoint used by the Classification Port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_classifier_base_url")]
    pub base_url: String,

    /// Bearer token
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_classifier_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound for a single classification call; a timeout is handled
    /// exactly like an unparseable reply.
    #[serde(default = "default_classify_timeout")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: default_classifier_base_url(),
            api_key: String::new(),
            model: default_classifier_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_classify_timeout(),
        }
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Weather source. Without an API key, current weather falls back to mock data
/// and forecasts are unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_weather_url")]
    pub base_url: String,

    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    #[serde(default = "default_weather_timeout")]
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_url(),
            forecast_url: default_forecast_url(),
            timeout_secs: default_weather_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Directory of `*.yaml` workflow templates loaded on top of the built-ins
    #[serde(default)]
    pub template_dir: Option<String>,
}

fn default_classifier_base_url() -> String {
    DEFAULT_CLASSIFIER_BASE_URL.to_string()
}

fn default_classifier_model() -> String {
    DEFAULT_CLASSIFIER_MODEL.to_string()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_classify_timeout() -> u64 {
    30
}

fn default_weather_url() -> String {
    DEFAULT_WEATHER_URL.to_string()
}

fn default_forecast_url() -> String {
    DEFAULT_FORECAST_URL.to_string()
}

fn default_weather_timeout() -> u64 {
    10
}

impl ConciergeConfig {
    /// Build configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            config.classifier.api_key = key;
        }
        if let Ok(url) = std::env::var("CONCIERGE_BASE_URL") {
            config.classifier.base_url = url;
        }
        if let Ok(model) = std::env::var("CONCIERGE_MODEL") {
            config.classifier.model = model;
        }
        if let Some(secs) = std::env::var("CONCIERGE_CLASSIFY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            config.classifier.timeout_secs = secs;
        }
        config.weather.api_key = std::env::var("OPENWEATHERMAP_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        config.workflows.template_dir = std::env::var("CONCIERGE_TEMPLATE_DIR").ok();

        config
    }

    /// Parse configuration from a YAML string, expanding `${ENV}` references.
    pub fn from_yaml(yaml: &str) -> ConciergeResult<Self> {
        let expanded = resolve_env_vars(yaml);
        let mut config: Self = serde_yaml::from_str(&expanded)
            .map_err(|e| ConciergeError::Config(format!("Failed to parse config YAML: {}", e)))?;
        config.weather.api_key = config.weather.api_key.filter(|k| !k.trim().is_empty());
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> ConciergeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConciergeError::Config(format!("Failed to read config file '{}': {}", path, e))
        })?;
        Self::from_yaml(&content)
    }
}

fn env_ref_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$\{([^}]+)\}").ok())
        .as_ref()
}

/// Resolve environment variable references in a string.
/// Supports `${ENV_VAR}` and `${ENV_VAR:-default}` syntax. Unset variables
/// without a default are left verbatim.
pub fn resolve_env_vars(input: &str) -> String {
    let Some(re) = env_ref_pattern() else {
        return input.to_string();
    };
    re.replace_all(input, |caps: &regex::Captures| {
        let var_expr = &caps[1];
        if let Some(idx) = var_expr.find(":-") {
            let var_name = &var_expr[..idx];
            let default_val = &var_expr[idx + 2..];
            std::env::var(var_name).unwrap_or_else(|_| default_val.to_string())
        } else {
            std::env::var(var_expr).unwrap_or_else(|_| format!("${{{}}}", var_expr))
        }
    })
    .to_string()
}
