//! Product specialist: catalogue search, details and stock checks.

use serde::Deserialize;

use super::{is_blank, product_id, query_block, render_reply};
use crate::classify::{lenient_string, Classifier, ParsedReply};
use crate::models::{HandlerResult, QueryContext};
use crate::tools::ProductTools;

const HELP_TEXT: &str = "I can help you with product information! Here's what I can do:

• Search for products - Tell me what you're looking for
• Get detailed product information - Provide a product ID (PROD001, etc.)
• Check product availability and stock levels
• Compare products and features

What product information can I help you find today?";

const RENDER_GUIDANCE: &str = "Create a friendly, informative response. If showing products, highlight key features.\nIf checking availability, clearly state stock status.\nBe helpful and encourage purchase if appropriate.";

#[derive(Debug, Deserialize)]
struct ProductIntent {
    action: String,
    #[serde(default, deserialize_with = "lenient_string")]
    product_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    search_terms: Option<String>,
}

pub struct ProductHandler {
    classifier: Classifier,
    tools: ProductTools,
}

impl ProductHandler {
    pub const NAME: &'static str = "Product Agent";
    pub const DESCRIPTION: &'static str = "Handles product searches, details, and availability";

    pub fn new(classifier: Classifier, tools: ProductTools) -> Self {
        Self { classifier, tools }
    }

    pub fn tools(&self) -> &ProductTools {
        &self.tools
    }

    pub fn help() -> HandlerResult {
        HandlerResult::static_reply(Self::NAME, HELP_TEXT)
    }

    pub async fn process(&self, query: &str, context: &QueryContext) -> HandlerResult {
        if is_blank(query) {
            return Self::help();
        }

        let ParsedReply::Parsed(intent) = self
            .classifier
            .classify::<ProductIntent>(&analysis_prompt(query, context))
            .await
        else {
            tracing::warn!("[{}] Unparseable classification, providing help", Self::NAME);
            return Self::help();
        };

        let id = product_id(intent.product_id.as_deref());
        let (outcome, response_type) = match (intent.action.trim().to_lowercase().as_str(), id) {
            ("search_products", _) => match intent.search_terms.as_deref() {
                Some(terms) => (self.tools.search_products(terms).await, "search"),
                None => return Self::help(),
            },
            ("get_product_details", Some(id)) => {
                (self.tools.get_product_details(&id).await, "details")
            }
            ("check_availability", Some(id)) => {
                (self.tools.check_availability(&id).await, "availability")
            }
            ("check_availability", None) => (
                self.tools.search_products(query).await,
                "search_availability",
            ),
            _ => return Self::help(),
        };

        render_reply(
            &self.classifier,
            Self::NAME,
            "product",
            query,
            response_type,
            RENDER_GUIDANCE,
            outcome,
        )
        .await
    }
}

fn analysis_prompt(query: &str, context: &QueryContext) -> String {
    format!(
        r#"Analyze this customer query about products:
{}

Determine the action needed:
1. search_products - if searching for products by name/category
2. get_product_details - if asking about specific product (with ID)
3. check_availability - if asking about stock/availability
4. general_info - for general product questions

Extract product ID if mentioned (format: PROD followed by numbers).
Extract search terms if searching.

Respond in JSON format:
{{
    "action": "action_name",
    "product_id": "extracted_product_id_or_null",
    "search_terms": "extracted_search_terms_or_null",
    "confidence": 0.95
}}"#,
        query_block(query, context)
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::classify::ScriptedPort;

    fn handler(port: ScriptedPort) -> ProductHandler {
        let classifier = Classifier::new(Arc::new(port), Duration::from_secs(1));
        ProductHandler::new(classifier, ProductTools::new())
    }

    #[tokio::test]
    async fn test_availability_by_id() {
        let handler = handler(
            ScriptedPort::new("The gaming mouse is out of stock.").on(
                "about products",
                r#"{"action": "check_availability", "product_id": "PROD003"}"#,
            ),
        );
        let result = handler
            .process("Is PROD003 in stock?", &QueryContext::default())
            .await;
        assert!(result.success);
        let data = result.payload.unwrap();
        assert_eq!(data.data().unwrap()["available"], false);
        assert_eq!(data.data().unwrap()["quantity"], 0);
    }

    #[tokio::test]
    async fn test_search_without_terms_gives_help() {
        let handler = handler(
            ScriptedPort::new("unused")
                .on("about products", r#"{"action": "search_products", "search_terms": null}"#),
        );
        let result = handler.process("show me stuff", &QueryContext::default()).await;
        assert_eq!(result.reply_text, HELP_TEXT);
        assert!(result.payload.is_none());
    }

    #[tokio::test]
    async fn test_details_for_unknown_product_fails() {
        let handler = handler(
            ScriptedPort::new("")
                .on("about products", r#"{"action": "get_product_details", "product_id": "PROD999"}"#),
        );
        let result = handler
            .process("Tell me about PROD999", &QueryContext::default())
            .await;
        assert!(!result.success);
        assert!(result.reply_text.contains("Product PROD999 not found"));
    }
}
