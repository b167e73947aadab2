//! Results returned to callers of the Router and the Workflow Engine.

use serde::{Deserialize, Serialize};

use crate::tools::ToolOutcome;

/// Handler id used whenever routing cannot be trusted.
pub const FALLBACK_HANDLER_ID: &str = "support";

/// The Router's choice of handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub handler_id: String,
    /// Always within `[0, 1]`
    pub confidence: f64,
    pub rationale: String,
    /// Set only when the Router could not trust the classifier's choice.
    #[serde(default)]
    pub fallback: bool,
}

impl RoutingDecision {
    pub fn new(handler_id: impl Into<String>, confidence: f64, rationale: impl Into<String>) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            handler_id: handler_id.into(),
            confidence,
            rationale: rationale.into(),
            fallback: false,
        }
    }

    /// Decision recorded when classification failed or named an unknown handler.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            fallback: true,
            ..Self::new(FALLBACK_HANDLER_ID, 0.0, reason)
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// Unit returned to the caller and recorded as a workflow step result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResult {
    pub handler_name: String,
    pub reply_text: String,
    /// Tool output passed through unmodified; `None` for help/clarification replies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ToolOutcome>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingDecision>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub escalated: bool,
}

impl HandlerResult {
    /// A reply that did not involve a tool call. Always successful.
    pub fn static_reply(handler_name: impl Into<String>, reply_text: impl Into<String>) -> Self {
        Self {
            handler_name: handler_name.into(),
            reply_text: reply_text.into(),
            payload: None,
            success: true,
            routing: None,
            escalated: false,
        }
    }

    /// A reply backed by a tool outcome; `success` mirrors the outcome.
    pub fn from_outcome(
        handler_name: impl Into<String>,
        reply_text: impl Into<String>,
        outcome: ToolOutcome,
    ) -> Self {
        Self {
            handler_name: handler_name.into(),
            reply_text: reply_text.into(),
            success: outcome.is_success(),
            payload: Some(outcome),
            routing: None,
            escalated: false,
        }
    }

    pub fn with_routing(mut self, routing: RoutingDecision) -> Self {
        self.routing = Some(routing);
        self
    }
}

/// Static description of a registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(RoutingDecision::new("order", 1.7, "").confidence, 1.0);
        assert_eq!(RoutingDecision::new("order", -0.2, "").confidence, 0.0);
        assert_eq!(RoutingDecision::new("order", f64::NAN, "").confidence, 0.0);
    }

    #[test]
    fn test_fallback_is_recorded_not_inferred() {
        let chosen = RoutingDecision::new("support", 0.0, "classifier picked support");
        assert!(!chosen.is_fallback());

        let fallback = RoutingDecision::fallback("unparseable routing reply");
        assert!(fallback.is_fallback());
        assert_eq!(fallback.handler_id, FALLBACK_HANDLER_ID);
        assert_eq!(fallback.confidence, 0.0);

        let json = serde_json::to_value(&fallback).unwrap();
        assert_eq!(json["fallback"], true);
        let decoded: RoutingDecision =
            serde_json::from_value(serde_json::json!({"handlerId": "order", "confidence": 0.4, "rationale": ""}))
                .unwrap();
        assert!(!decoded.is_fallback());
    }

    #[test]
    fn test_success_mirrors_outcome() {
        let failed = HandlerResult::from_outcome("Order Agent", "sorry", ToolOutcome::failure("nope"));
        assert!(!failed.success);
        let help = HandlerResult::static_reply("Order Agent", "help");
        assert!(help.success);
        assert!(help.payload.is_none());

        let json = serde_json::to_value(&help).unwrap();
        assert!(json.get("escalated").is_none());
        assert!(json.get("payload").is_none());
    }
}
