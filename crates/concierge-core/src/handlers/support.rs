//! Support specialist: FAQ answers, tickets, and escalation to a human.

use serde::Deserialize;

use super::{is_blank, query_block, render_reply};
use crate::classify::{lenient_bool, lenient_string, Classifier, ParsedReply};
use crate::models::{HandlerResult, QueryContext};
use crate::tools::{SupportTools, DEFAULT_CUSTOMER_EMAIL};

const HELP_TEXT: &str = "I'm here to help with any support questions! I can assist you with:

• Shipping and delivery information
• Return and refund policies
• Warranty information
• Payment and billing questions
• Technical support issues
• Account problems

I can also create a support ticket for complex issues or connect you with a human agent if needed.

What can I help you with today?";

const ESCALATION_TEXT: &str = "I understand you need additional assistance. I'm connecting you with a human agent who can better help you with your concern.

In the meantime, I've created a priority support ticket for you. A human representative will contact you within 2 hours.

Is there anything else I can help you with while you wait?";

const RENDER_GUIDANCE: &str = "Create a friendly, helpful support response. Be empathetic and professional.\nIf providing FAQ info, be comprehensive but concise.";

/// Words that mark a query as frustrated regardless of classification.
pub const FRUSTRATION_KEYWORDS: [&str; 5] =
    ["angry", "frustrated", "disappointed", "terrible", "awful"];

const ESCALATED_ISSUE_TYPE: &str = "escalated";
const GENERAL_ISSUE_TYPE: &str = "general_inquiry";

#[derive(Debug, Deserialize)]
struct SupportIntent {
    action: String,
    #[serde(default, deserialize_with = "lenient_string")]
    faq_topic: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    frustrated: bool,
}

pub fn is_frustrated(query: &str) -> bool {
    let lower = query.to_lowercase();
    FRUSTRATION_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub struct SupportHandler {
    classifier: Classifier,
    tools: SupportTools,
}

impl SupportHandler {
    pub const NAME: &'static str = "Support Agent";
    pub const DESCRIPTION: &'static str = "Handles general support, FAQs, and ticket creation";

    pub fn new(classifier: Classifier, tools: SupportTools) -> Self {
        Self { classifier, tools }
    }

    pub fn tools(&self) -> &SupportTools {
        &self.tools
    }

    pub fn help() -> HandlerResult {
        HandlerResult::static_reply(Self::NAME, HELP_TEXT)
    }

    pub async fn process(&self, query: &str, context: &QueryContext) -> HandlerResult {
        if is_blank(query) {
            return Self::help();
        }

        if is_frustrated(query) {
            tracing::info!("[{}] Frustration keywords present, escalating", Self::NAME);
            return self.escalate(query, context).await;
        }

        let ParsedReply::Parsed(intent) = self
            .classifier
            .classify::<SupportIntent>(&analysis_prompt(query, context))
            .await
        else {
            tracing::warn!("[{}] Unparseable classification, providing help", Self::NAME);
            return Self::help();
        };

        let action = intent.action.trim().to_lowercase();
        if intent.frustrated || action == "escalate" {
            return self.escalate(query, context).await;
        }

        let (outcome, response_type) = match action.as_str() {
            "faq_answer" => match intent.faq_topic.as_deref() {
                Some(topic) => (self.tools.get_faq_answer(topic).await, "faq"),
                None => return Self::help(),
            },
            "create_ticket" => (
                self.tools
                    .create_support_ticket(customer_email(context), GENERAL_ISSUE_TYPE, query.trim())
                    .await,
                "ticket",
            ),
            _ => return Self::help(),
        };

        render_reply(
            &self.classifier,
            Self::NAME,
            "support",
            query,
            response_type,
            RENDER_GUIDANCE,
            outcome,
        )
        .await
    }

    /// Open a priority ticket for a human agent. Never calls the classifier.
    async fn escalate(&self, query: &str, context: &QueryContext) -> HandlerResult {
        let outcome = self
            .tools
            .create_support_ticket(
                customer_email(context),
                ESCALATED_ISSUE_TYPE,
                &format!("Escalated query: {}", query.trim()),
            )
            .await;

        let mut result = HandlerResult::from_outcome(Self::NAME, ESCALATION_TEXT, outcome);
        result.escalated = true;
        result
    }
}

fn customer_email(context: &QueryContext) -> &str {
    context
        .data_str("customer_email")
        .unwrap_or(DEFAULT_CUSTOMER_EMAIL)
}

fn analysis_prompt(query: &str, context: &QueryContext) -> String {
    format!(
        r#"Analyze this customer support query:
{}

Determine the action needed:
1. faq_answer - if asking about common topics (shipping, returns, warranty, payment)
2. create_ticket - if reporting an issue that needs human attention
3. escalate - if customer is frustrated or needs human agent
4. general_help - for general support questions

Extract FAQ topic if relevant.
Determine if customer seems frustrated (keywords: {}).

Respond in JSON format:
{{
    "action": "action_name",
    "faq_topic": "extracted_topic_or_null",
    "frustrated": true_or_false,
    "confidence": 0.95
}}"#,
        query_block(query, context),
        FRUSTRATION_KEYWORDS.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::classify::ScriptedPort;
    use crate::tools::TicketStatus;

    fn handler(port: ScriptedPort) -> (SupportHandler, Arc<ScriptedPort>) {
        let port = Arc::new(port);
        let classifier = Classifier::new(port.clone(), Duration::from_secs(1));
        (SupportHandler::new(classifier, SupportTools::new()), port)
    }

    #[test]
    fn test_frustration_keywords() {
        assert!(is_frustrated("This is TERRIBLE service"));
        assert!(!is_frustrated("How do returns work?"));
    }

    #[tokio::test]
    async fn test_keyword_escalation_creates_one_ticket() {
        let (handler, port) = handler(
            ScriptedPort::new("")
                .on("support query", r#"{"action": "faq_answer", "faq_topic": "returns"}"#),
        );
        let result = handler
            .process("I am so frustrated with returns", &QueryContext::default())
            .await;

        assert!(result.escalated);
        assert!(result.success);
        assert_eq!(result.reply_text, ESCALATION_TEXT);
        assert_eq!(port.call_count(), 0);

        let tickets = handler.tools().tickets().await;
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].issue_type, "escalated");
        assert_eq!(tickets[0].description, "Escalated query: I am so frustrated with returns");
        assert_eq!(tickets[0].status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn test_model_flagged_frustration_escalates() {
        let (handler, _) = handler(ScriptedPort::new(
            r#"{"action": "general_help", "frustrated": "true"}"#,
        ));
        let result = handler
            .process("nothing works anymore", &QueryContext::default())
            .await;
        assert!(result.escalated);
        assert_eq!(handler.tools().ticket_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_ticket_uses_context_email() {
        let (handler, _) = handler(
            ScriptedPort::new("Ticket created.")
                .on("support query", r#"{"action": "create_ticket"}"#),
        );
        let context = QueryContext::with_data(HashMap::from([(
            "customer_email".to_string(),
            serde_json::json!("jane@example.com"),
        )]));
        let result = handler.process("My account is locked", &context).await;

        assert!(result.success);
        assert!(!result.escalated);
        let tickets = handler.tools().tickets().await;
        assert_eq!(tickets[0].customer_email, "jane@example.com");
        assert_eq!(tickets[0].issue_type, "general_inquiry");
    }

    #[tokio::test]
    async fn test_prose_reply_gives_help() {
        let (handler, _) = handler(ScriptedPort::new("I think the user wants help."));
        let result = handler.process("hello?", &QueryContext::default()).await;
        assert_eq!(result.reply_text, HELP_TEXT);
        assert_eq!(handler.tools().ticket_count().await, 0);
    }
}
