//! Query context passed to handlers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of history entries embedded into classification prompts.
pub const PROMPT_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

impl HistoryRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryRole::User => "user",
            HistoryRole::Assistant => "assistant",
        }
    }
}

/// One entry of recent conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub text: String,
    /// Display name of the handler that produced an assistant entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::User,
            text: text.into(),
            handler: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::Assistant,
            text: text.into(),
            handler: Some(handler.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Optional context accompanying a query: recent history plus free-form data
/// (workflow sessions pass their carried data here).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl QueryContext {
    pub fn with_history(history: Vec<HistoryEntry>) -> Self {
        Self {
            history,
            data: HashMap::new(),
        }
    }

    pub fn with_data(data: HashMap<String, serde_json::Value>) -> Self {
        Self {
            history: Vec::new(),
            data,
        }
    }

    /// String value from the data map, if present and non-empty.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Render the most recent history entries for inclusion in a prompt.
    /// Returns an empty string when there is no history.
    pub fn history_block(&self) -> String {
        if self.history.is_empty() {
            return String::new();
        }
        let skip = self.history.len().saturating_sub(PROMPT_HISTORY_LIMIT);
        let mut block = String::from("Recent conversation:\n");
        for entry in self.history.iter().skip(skip) {
            match &entry.handler {
                Some(handler) => block.push_str(&format!(
                    "- {} ({}): {}\n",
                    entry.role.as_str(),
                    handler,
                    entry.text
                )),
                None => block.push_str(&format!("- {}: {}\n", entry.role.as_str(), entry.text)),
            }
        }
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_block_keeps_last_entries() {
        let history = (0..8)
            .map(|i| HistoryEntry::user(format!("message {}", i)))
            .collect();
        let ctx = QueryContext::with_history(history);
        let block = ctx.history_block();
        assert!(!block.contains("message 2"));
        assert!(block.contains("message 3"));
        assert!(block.contains("message 7"));
    }

    #[test]
    fn test_history_block_empty() {
        assert_eq!(QueryContext::default().history_block(), "");
    }

    #[test]
    fn test_data_str_ignores_blank() {
        let mut data = HashMap::new();
        data.insert("customer_email".to_string(), serde_json::json!("  "));
        data.insert("query".to_string(), serde_json::json!("start workflow"));
        let ctx = QueryContext::with_data(data);
        assert_eq!(ctx.data_str("customer_email"), None);
        assert_eq!(ctx.data_str("query"), Some("start workflow"));
    }
}
