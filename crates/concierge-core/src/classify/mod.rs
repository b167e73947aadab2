//! Classification Port: the narrow contract to the external text-completion
//! engine, and the defensive parsing that sits on top of it.
//!
//! ```text
//! prompt ──► Classifier (timeout) ──► ClassificationPort ──► raw text
//!                                                              │
//!                              extract_json_object ◄───────────┘
//!                                      │
//!                         ParsedReply::{Parsed(T), Unparseable}
//! ```
//!
//! The port never gets trusted: a reply may be prose, truncated JSON, JSON
//! without the fields we need, or an error string. Port errors and timeouts
//! are folded into `Unparseable` so every call site handles exactly two cases.

pub mod http;
pub mod scripted;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::error::ConciergeResult;

pub use http::HttpClassificationPort;
pub use scripted::ScriptedPort;

/// External text-completion capability.
#[async_trait]
pub trait ClassificationPort: Send + Sync {
    /// Send a single prompt and return the raw reply text.
    async fn complete(&self, prompt: &str) -> ConciergeResult<String>;
}

/// Outcome of parsing structured data out of a classifier reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply<T> {
    Parsed(T),
    Unparseable,
}

impl<T> ParsedReply<T> {
    pub fn parsed(self) -> Option<T> {
        match self {
            ParsedReply::Parsed(value) => Some(value),
            ParsedReply::Unparseable => None,
        }
    }
}

/// Timeout-bounded wrapper around a shared [`ClassificationPort`].
#[derive(Clone)]
pub struct Classifier {
    port: Arc<dyn ClassificationPort>,
    timeout: Duration,
}

impl Classifier {
    pub fn new(port: Arc<dyn ClassificationPort>, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Raw completion. `None` on port error, timeout, blank reply, or an
    /// error-shaped reply (`Error: ...`).
    pub async fn complete(&self, prompt: &str) -> Option<String> {
        match tokio::time::timeout(self.timeout, self.port.complete(prompt)).await {
            Ok(Ok(text)) if is_error_reply(&text) => {
                tracing::warn!(
                    "[Classifier] Error reply from classification port: {}",
                    truncate(text.trim(), 120)
                );
                None
            }
            Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
            Ok(Ok(_)) => {
                tracing::warn!("[Classifier] Empty reply from classification port");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!("[Classifier] Classification port failed: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    "[Classifier] Classification timed out after {:?}",
                    self.timeout
                );
                None
            }
        }
    }

    /// Ask the port and parse the first JSON object in its reply as `T`.
    pub async fn classify<T: DeserializeOwned>(&self, prompt: &str) -> ParsedReply<T> {
        match self.complete(prompt).await {
            Some(reply) => parse_reply(&reply),
            None => ParsedReply::Unparseable,
        }
    }
}

/// Replies some endpoints return in place of a failure status.
pub fn is_error_reply(reply: &str) -> bool {
    reply
        .trim_start()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("error:"))
}

/// Parse the first JSON object embedded in `reply` as `T`.
pub fn parse_reply<T: DeserializeOwned>(reply: &str) -> ParsedReply<T> {
    let Some(object) = extract_json_object(reply) else {
        tracing::debug!("[Classifier] No JSON object in reply: {}", truncate(reply, 120));
        return ParsedReply::Unparseable;
    };
    match serde_json::from_value::<T>(object) {
        Ok(value) => ParsedReply::Parsed(value),
        Err(e) => {
            tracing::debug!("[Classifier] Reply JSON missing required fields: {}", e);
            ParsedReply::Unparseable
        }
    }
}

/// Find the first bracket-balanced `{...}` block in `text` that parses as a
/// JSON object. Braces inside string literals are ignored; a candidate that
/// fails to parse moves the search to the next `{`.
pub fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        if let Some(close) = matching_brace(bytes, open) {
            if let Ok(value @ serde_json::Value::Object(_)) =
                serde_json::from_str::<serde_json::Value>(&text[open..=close])
            {
                return Some(value);
            }
        }
        start = open + 1;
    }

    None
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Deserialize an optional string, treating `null`, blanks and placeholder
/// values such as `"null"` or `"none"` as absent.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            let lower = trimmed.to_lowercase();
            if trimmed.is_empty()
                || matches!(lower.as_str(), "null" | "none" | "n/a" | "unknown")
                || lower.contains("_or_null")
            {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// Deserialize a loosely typed boolean (`true`, `"true"`, `"yes"`, `1`).
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::String(s)) => {
            matches!(s.trim().to_lowercase().as_str(), "true" | "yes")
        }
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    })
}

/// Deserialize a loosely typed positive integer (`5`, `"5"`, `5.0`).
pub fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n.min(u32::MAX as u64) as u32),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}

/// Deserialize a loosely typed float (`0.9`, `"0.9"`).
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
