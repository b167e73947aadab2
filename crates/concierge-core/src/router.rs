//! Router - picks a specialist handler for a free-text query.
//!
//! The classifier is asked for `{handler, confidence, reasoning}`. Anything
//! else (prose, a timeout, an id nobody registered) lands on the support
//! handler with a fallback decision attached.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::classify::{lenient_f64, Classifier, ParsedReply};
use crate::config::WeatherConfig;
use crate::handlers::{
    query_block, Handler, HandlerKind, OrderHandler, ProductHandler, SupportHandler,
    WeatherHandler,
};
use crate::models::{Capability, HandlerResult, QueryContext, RoutingDecision};
use crate::tools::{OrderTools, ProductTools, SupportTools, WeatherTools};

const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Deserialize)]
struct RoutingReply {
    #[serde(alias = "agent")]
    handler: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
}

pub struct Router {
    classifier: Classifier,
    order: Handler,
    product: Handler,
    support: Handler,
    weather: Handler,
}

impl Router {
    /// Router over freshly seeded tool adapters.
    pub fn new(classifier: Classifier, weather: WeatherConfig) -> Self {
        Self::with_tools(
            classifier,
            OrderTools::new(),
            ProductTools::new(),
            SupportTools::new(),
            WeatherTools::new(weather),
        )
    }

    pub fn with_tools(
        classifier: Classifier,
        orders: OrderTools,
        products: ProductTools,
        support: SupportTools,
        weather: WeatherTools,
    ) -> Self {
        Self {
            order: Handler::Order(OrderHandler::new(classifier.clone(), orders)),
            product: Handler::Product(ProductHandler::new(classifier.clone(), products)),
            support: Handler::Support(SupportHandler::new(classifier.clone(), support)),
            weather: Handler::Weather(WeatherHandler::new(classifier.clone(), weather)),
            classifier,
        }
    }

    pub fn handler(&self, kind: HandlerKind) -> &Handler {
        match kind {
            HandlerKind::Order => &self.order,
            HandlerKind::Product => &self.product,
            HandlerKind::Support => &self.support,
            HandlerKind::Weather => &self.weather,
        }
    }

    /// String lookup used by workflow steps.
    pub fn handler_by_id(&self, id: &str) -> Option<&Handler> {
        HandlerKind::from_id(id).map(|kind| self.handler(kind))
    }

    pub fn support_tools(&self) -> Option<&SupportTools> {
        match &self.support {
            Handler::Support(h) => Some(h.tools()),
            _ => None,
        }
    }

    pub fn order_tools(&self) -> Option<&OrderTools> {
        match &self.order {
            Handler::Order(h) => Some(h.tools()),
            _ => None,
        }
    }

    /// Static `{id: {name, description}}` map of every registered handler.
    pub fn list_capabilities(&self) -> BTreeMap<String, Capability> {
        HandlerKind::ALL
            .iter()
            .map(|kind| {
                let handler = self.handler(*kind);
                (
                    kind.id().to_string(),
                    Capability {
                        name: handler.name().to_string(),
                        description: handler.description().to_string(),
                    },
                )
            })
            .collect()
    }

    /// Route `query` to one handler and run it.
    pub async fn route(&self, query: &str, context: &QueryContext) -> HandlerResult {
        let request_id = uuid::Uuid::new_v4();

        let decision = if query.trim().is_empty() {
            tracing::debug!("[Router] {} Blank query, routing to support", request_id);
            RoutingDecision::fallback("Empty query")
        } else {
            self.decide(request_id, query, context).await
        };

        let kind = HandlerKind::from_id(&decision.handler_id).unwrap_or(HandlerKind::Support);
        let handler = self.handler(kind);

        tracing::info!(
            "[Router] {} -> {} (confidence {:.2})",
            request_id,
            handler.name(),
            decision.confidence
        );

        handler.process(query, context).await.with_routing(decision)
    }

    async fn decide(
        &self,
        request_id: uuid::Uuid,
        query: &str,
        context: &QueryContext,
    ) -> RoutingDecision {
        let reply = self
            .classifier
            .classify::<RoutingReply>(&routing_prompt(query, context))
            .await;

        let ParsedReply::Parsed(reply) = reply else {
            tracing::warn!(
                "[Router] {} Unparseable routing reply, falling back to support",
                request_id
            );
            return RoutingDecision::fallback("Routing reply could not be parsed");
        };

        match HandlerKind::from_id(&reply.handler) {
            Some(kind) => RoutingDecision::new(
                kind.id(),
                reply.confidence.unwrap_or(DEFAULT_CONFIDENCE),
                reply.reasoning.unwrap_or_default(),
            ),
            None => {
                tracing::warn!(
                    "[Router] {} Unknown handler '{}', falling back to support",
                    request_id,
                    reply.handler
                );
                RoutingDecision::fallback(format!("Unknown handler '{}'", reply.handler))
            }
        }
    }
}

fn routing_prompt(query: &str, context: &QueryContext) -> String {
    let handlers = HandlerKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| format!("{}. {} - {}", i + 1, kind.id(), kind.routing_hint()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze this customer query and determine which handler should take it:

{}

Available handlers:
{}

Consider the main intent and keywords.
Output ONLY the JSON below, without any explanation or text:

{{
    "handler": "handler_id",
    "confidence": 0.95,
    "reasoning": "brief explanation"
}}"#,
        query_block(query, context),
        handlers
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::classify::ScriptedPort;

    fn router(port: ScriptedPort) -> (Router, Arc<ScriptedPort>) {
        let port = Arc::new(port);
        let classifier = Classifier::new(port.clone(), Duration::from_secs(1));
        (Router::new(classifier, WeatherConfig::default()), port)
    }

    #[test]
    fn test_capabilities_are_static() {
        let (router, port) = router(ScriptedPort::new(""));
        let caps = router.list_capabilities();
        assert_eq!(
            caps.keys().collect::<Vec<_>>(),
            vec!["order", "product", "support", "weather"]
        );
        assert_eq!(caps["weather"].name, "Weather Agent");
        assert_eq!(port.call_count(), 0);
    }

    #[tokio::test]
    async fn test_agent_alias_and_confidence_string() {
        let (router, _) = router(
            ScriptedPort::new("")
                .on("which handler", r#"{"agent": "weather", "confidence": "0.8", "reasoning": "asks about rain"}"#)
                .on("weather query", r#"{"location": "Tokyo"}"#),
        );
        let result = router.route("Is it raining in Tokyo?", &QueryContext::default()).await;
        let routing = result.routing.unwrap();
        assert_eq!(routing.handler_id, "weather");
        assert_eq!(routing.confidence, 0.8);
        assert_eq!(result.handler_name, "Weather Agent");
    }

    #[tokio::test]
    async fn test_missing_confidence_defaults() {
        let (router, _) = router(ScriptedPort::new("").on("which handler", r#"{"handler": "order"}"#));
        let result = router.route("order stuff", &QueryContext::default()).await;
        assert_eq!(result.routing.unwrap().confidence, DEFAULT_CONFIDENCE);
        assert_eq!(result.handler_name, "Order Agent");
    }

    #[tokio::test]
    async fn test_unknown_handler_falls_back_to_support() {
        let (router, _) = router(
            ScriptedPort::new("").on("which handler", r#"{"handler": "billing", "confidence": 0.99}"#),
        );
        let result = router.route("Where is my invoice?", &QueryContext::default()).await;
        assert_eq!(result.handler_name, "Support Agent");
        assert!(result.routing.unwrap().is_fallback());
    }

    #[tokio::test]
    async fn test_zero_confidence_support_choice_is_not_fallback() {
        let (router, _) = router(
            ScriptedPort::new("").on("which handler", r#"{"handler": "support", "confidence": 0}"#),
        );
        let result = router.route("Hello?", &QueryContext::default()).await;
        let routing = result.routing.unwrap();
        assert_eq!(routing.handler_id, "support");
        assert_eq!(routing.confidence, 0.0);
        assert!(!routing.is_fallback());
    }
}
