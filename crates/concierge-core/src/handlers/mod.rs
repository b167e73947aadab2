//! Specialist handlers: one per domain, behind a single closed enum.
//!
//! Every handler follows the same protocol:
//!
//! 1. blank query → static help, classifier untouched
//! 2. classify the query against the domain's action taxonomy
//! 3. `Unparseable` or a missing id → static help (never fails)
//! 4. call the domain tool, render the outcome through the classifier
//!    (falling back to a fixed summary if rendering fails)

pub mod order;
pub mod product;
pub mod support;
pub mod weather;

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::Classifier;
use crate::models::{HandlerResult, QueryContext};
use crate::tools::ToolOutcome;

pub use order::OrderHandler;
pub use product::ProductHandler;
pub use support::SupportHandler;
pub use weather::WeatherHandler;

/// Registered handler ids. The set is closed; only routing and workflow
/// templates address handlers by string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Order,
    Product,
    Support,
    Weather,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 4] = [
        HandlerKind::Order,
        HandlerKind::Product,
        HandlerKind::Support,
        HandlerKind::Weather,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            HandlerKind::Order => "order",
            HandlerKind::Product => "product",
            HandlerKind::Support => "support",
            HandlerKind::Weather => "weather",
        }
    }

    /// Case-insensitive lookup by id.
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "order" => Some(HandlerKind::Order),
            "product" => Some(HandlerKind::Product),
            "support" => Some(HandlerKind::Support),
            "weather" => Some(HandlerKind::Weather),
            _ => None,
        }
    }

    /// Routing hint shown to the classifier.
    pub fn routing_hint(&self) -> &'static str {
        match self {
            HandlerKind::Order => "handles order status, tracking, cancellations (keywords: order, track, cancel, shipping, delivery)",
            HandlerKind::Product => "handles product search, details, availability (keywords: product, item, buy, price, stock, available)",
            HandlerKind::Support => "handles general support, FAQ, complaints (keywords: help, support, problem, issue, refund, return, policy)",
            HandlerKind::Weather => "handles weather queries (keywords: weather, temperature, forecast, climate)",
        }
    }
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// A specialist handler.
pub enum Handler {
    Order(OrderHandler),
    Product(ProductHandler),
    Support(SupportHandler),
    Weather(WeatherHandler),
}

impl Handler {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::Order(_) => HandlerKind::Order,
            Handler::Product(_) => HandlerKind::Product,
            Handler::Support(_) => HandlerKind::Support,
            Handler::Weather(_) => HandlerKind::Weather,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Handler::Order(_) => OrderHandler::NAME,
            Handler::Product(_) => ProductHandler::NAME,
            Handler::Support(_) => SupportHandler::NAME,
            Handler::Weather(_) => WeatherHandler::NAME,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Handler::Order(_) => OrderHandler::DESCRIPTION,
            Handler::Product(_) => ProductHandler::DESCRIPTION,
            Handler::Support(_) => SupportHandler::DESCRIPTION,
            Handler::Weather(_) => WeatherHandler::DESCRIPTION,
        }
    }

    pub async fn process(&self, query: &str, context: &QueryContext) -> HandlerResult {
        match self {
            Handler::Order(h) => h.process(query, context).await,
            Handler::Product(h) => h.process(query, context).await,
            Handler::Support(h) => h.process(query, context).await,
            Handler::Weather(h) => h.process(query, context).await,
        }
    }
}

// ─── Shared dispatch helpers ──────────────────────────────────────────────

pub(crate) fn is_blank(query: &str) -> bool {
    query.trim().is_empty()
}

/// Prompt preamble: the query plus any recent history.
pub(crate) fn query_block(query: &str, context: &QueryContext) -> String {
    let history = context.history_block();
    if history.is_empty() {
        format!("Query: \"{}\"", query.trim())
    } else {
        format!("{}\nQuery: \"{}\"", history, query.trim())
    }
}

fn order_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\bORD\d+\b").ok()).as_ref()
}

fn product_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\bPROD\d+\b").ok()).as_ref()
}

fn find_id(candidate: Option<&str>, pattern: Option<&Regex>) -> Option<String> {
    let candidate = candidate?;
    pattern?
        .find(candidate)
        .map(|m| m.as_str().to_uppercase())
}

/// Normalise a classifier-supplied order id (`ORD` + digits).
pub(crate) fn order_id(candidate: Option<&str>) -> Option<String> {
    find_id(candidate, order_id_pattern())
}

/// Normalise a classifier-supplied product id (`PROD` + digits).
pub(crate) fn product_id(candidate: Option<&str>) -> Option<String> {
    find_id(candidate, product_id_pattern())
}

/// Render a tool outcome into a user-facing reply via the classifier.
/// `payload` is passed through untouched; a failed render falls back to a
/// fixed summary of the outcome.
pub(crate) async fn render_reply(
    classifier: &Classifier,
    handler_name: &str,
    domain: &str,
    query: &str,
    response_type: &str,
    guidance: &str,
    outcome: ToolOutcome,
) -> HandlerResult {
    let data = serde_json::to_string_pretty(&outcome).unwrap_or_else(|_| outcome.to_json().to_string());
    let prompt = format!(
        "Format a helpful {domain} response based on this data:\n\n\
         Customer Query: \"{query}\"\n\
         Response Type: {response_type}\n\
         Data: {data}\n\n\
         {guidance}",
        domain = domain,
        query = query.trim(),
        response_type = response_type,
        data = data,
        guidance = guidance,
    );

    let reply = match classifier.complete(&prompt).await {
        Some(text) => text.trim().to_string(),
        None => {
            tracing::warn!(
                "[{}] Reply rendering unavailable, using fixed summary",
                handler_name
            );
            summarize_outcome(&outcome)
        }
    };

    HandlerResult::from_outcome(handler_name, reply, outcome)
}

/// Deterministic reply used when the classifier cannot render one.
pub fn summarize_outcome(outcome: &ToolOutcome) -> String {
    match outcome {
        ToolOutcome::Failure { message } => {
            format!("I'm sorry, I couldn't complete that request: {}", message)
        }
        ToolOutcome::Success {
            message: Some(message),
            ..
        } => message.clone(),
        ToolOutcome::Success { data, .. } => format!(
            "Here's what I found:\n{}",
            serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_kind_ids() {
        for kind in HandlerKind::ALL {
            assert_eq!(HandlerKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(HandlerKind::from_id(" Weather "), Some(HandlerKind::Weather));
        assert_eq!(HandlerKind::from_id("billing"), None);
    }

    #[test]
    fn test_id_patterns() {
        assert_eq!(order_id(Some("ord001")), Some("ORD001".to_string()));
        assert_eq!(order_id(Some("order ORD42, please")), Some("ORD42".to_string()));
        assert_eq!(order_id(Some("PROD001")), None);
        assert_eq!(order_id(Some("ORDER")), None);
        assert_eq!(order_id(None), None);
        assert_eq!(product_id(Some("PROD003")), Some("PROD003".to_string()));
        assert_eq!(product_id(Some("product 3")), None);
    }

    #[test]
    fn test_summarize_outcome() {
        assert_eq!(
            summarize_outcome(&ToolOutcome::failure("Order ORD9 not found")),
            "I'm sorry, I couldn't complete that request: Order ORD9 not found"
        );
        assert_eq!(summarize_outcome(&ToolOutcome::success_message("done")), "done");
        assert!(summarize_outcome(&ToolOutcome::success(serde_json::json!({"a": 1})))
            .starts_with("Here's what I found:"));
    }
}
