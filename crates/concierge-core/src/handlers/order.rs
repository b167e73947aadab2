//! Order specialist: status, tracking, cancellation.

use serde::Deserialize;

use super::{is_blank, order_id, query_block, render_reply};
use crate::classify::{lenient_string, Classifier, ParsedReply};
use crate::models::{HandlerResult, QueryContext};
use crate::tools::OrderTools;

const HELP_TEXT: &str = "I can help you with order-related questions! Here's what I can do:

• Check order status - Just provide your order ID (format: ORD001)
• Track your shipment - I'll give you tracking information
• Cancel orders - For orders still in processing status
• Answer general order questions

Please provide your order ID, or let me know how else I can help with your order!";

const RENDER_GUIDANCE: &str = "Create a friendly, helpful response. If there's an error, be apologetic and offer alternatives.\nBe concise but informative.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderAction {
    GetOrderStatus,
    TrackOrder,
    CancelOrder,
    GeneralInfo,
}

impl OrderAction {
    fn parse(action: &str) -> Self {
        match action.trim().to_lowercase().as_str() {
            "get_order_status" => OrderAction::GetOrderStatus,
            "track_order" => OrderAction::TrackOrder,
            "cancel_order" => OrderAction::CancelOrder,
            _ => OrderAction::GeneralInfo,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderIntent {
    action: String,
    #[serde(default, deserialize_with = "lenient_string")]
    order_id: Option<String>,
}

pub struct OrderHandler {
    classifier: Classifier,
    tools: OrderTools,
}

impl OrderHandler {
    pub const NAME: &'static str = "Order Agent";
    pub const DESCRIPTION: &'static str =
        "Handles order-related queries, tracking, and cancellations";

    pub fn new(classifier: Classifier, tools: OrderTools) -> Self {
        Self { classifier, tools }
    }

    pub fn tools(&self) -> &OrderTools {
        &self.tools
    }

    /// Fixed capability list; never touches the classifier.
    pub fn help() -> HandlerResult {
        HandlerResult::static_reply(Self::NAME, HELP_TEXT)
    }

    pub async fn process(&self, query: &str, context: &QueryContext) -> HandlerResult {
        if is_blank(query) {
            return Self::help();
        }

        let intent = match self
            .classifier
            .classify::<OrderIntent>(&analysis_prompt(query, context))
            .await
        {
            ParsedReply::Parsed(intent) => intent,
            ParsedReply::Unparseable => {
                tracing::warn!("[{}] Unparseable classification, providing help", Self::NAME);
                return Self::help();
            }
        };

        let action = OrderAction::parse(&intent.action);
        let Some(id) = order_id(intent.order_id.as_deref()) else {
            tracing::debug!("[{}] No order id for action {:?}", Self::NAME, action);
            return Self::help();
        };

        let (outcome, response_type) = match action {
            OrderAction::GetOrderStatus => (self.tools.get_order_status(&id).await, "order_status"),
            OrderAction::TrackOrder => (self.tools.track_order(&id).await, "tracking"),
            OrderAction::CancelOrder => (self.tools.cancel_order(&id).await, "cancellation"),
            OrderAction::GeneralInfo => return Self::help(),
        };

        render_reply(
            &self.classifier,
            Self::NAME,
            "customer service",
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
        r#"Analyze this customer query about orders and determine the action needed:
{}

Possible actions:
1. get_order_status - if asking about order status
2. track_order - if asking about tracking
3. cancel_order - if wanting to cancel
4. general_info - if asking general order information

Extract any order ID mentioned (format: ORD followed by numbers).

Respond in JSON format:
{{
    "action": "action_name",
    "order_id": "extracted_order_id_or_null",
    "confidence": 0.95
}}"#,
        query_block(query, context)
    )
}
