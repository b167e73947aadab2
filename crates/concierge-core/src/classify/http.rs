//! HTTP Classification Port: calls an OpenAI-compatible chat-completions
//! endpoint (Groq by default).
//!
//! POST {base_url}/chat/completions
//! Headers:
//!   Authorization: Bearer {api_key}
//!   content-type: application/json

use async_trait::async_trait;

use super::ClassificationPort;
use crate::config::ClassifierConfig;
use crate::error::{ConciergeError, ConciergeResult};

pub struct HttpClassificationPort {
    client: reqwest::Client,
    config: ClassifierConfig,
}

impl HttpClassificationPort {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            // Transport-level ceiling; the Classifier applies the real bound.
            client: reqwest::Client::builder()
                .timeout(config.timeout() * 2)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        body["temperature"] = serde_json::Value::Number(
            serde_json::Number::from_f64(self.config.temperature)
                .unwrap_or_else(|| serde_json::Number::from(0)),
        );

        body
    }
}

#[async_trait]
impl ClassificationPort for HttpClassificationPort {
    async fn complete(&self, prompt: &str) -> ConciergeResult<String> {
        if self.config.api_key.is_empty() {
            return Err(ConciergeError::Classification(
                "No API key configured. Set GROQ_API_KEY or classifier.api_key.".to_string(),
            ));
        }

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        tracing::debug!(
            "[Classifier] Calling chat completions: {} (model: {})",
            url,
            self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("content-type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| ConciergeError::Classification(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            ConciergeError::Classification(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            return Err(ConciergeError::Classification(format!(
                "API returned {}: {}",
                status,
                super::truncate(&response_text, 300)
            )));
        }

        let json: serde_json::Value = serde_json::from_str(&response_text).map_err(|e| {
            ConciergeError::Classification(format!("Failed to parse response JSON: {}", e))
        })?;

        Ok(extract_content(&json))
    }
}

/// Pull `choices[0].message.content` out of a chat-completions body.
fn extract_content(json: &serde_json::Value) -> String {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string()
}
