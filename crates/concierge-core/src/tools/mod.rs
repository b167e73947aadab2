//! Domain tool adapters: the data operations each specialist handler calls.
//!
//!   1. orders    - order status, tracking, cancellation
//!   2. products  - search, details, availability
//!   3. support   - FAQ lookup, tickets, escalation
//!   4. weather   - current conditions and multi-day forecasts
//!
//! Every operation returns a [`ToolOutcome`]; misses and precondition
//! violations are failures with a message, never panics or errors.

pub mod orders;
pub mod products;
pub mod support;
pub mod weather;

pub use orders::{Order, OrderItem, OrderStatus, OrderTools};
pub use products::{Product, ProductTools};
pub use support::{SupportTools, Ticket, TicketPriority, TicketStatus, DEFAULT_CUSTOMER_EMAIL};
pub use weather::{WeatherTools, MAX_FORECAST_DAYS};

use serde::{Serialize, Serializer};

/// Result of a tool operation.
///
/// A failure carries a human-readable message and never any data.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success {
        data: serde_json::Value,
        message: Option<String>,
    },
    Failure {
        message: String,
    },
}

impl ToolOutcome {
    pub fn success(data: impl Serialize) -> Self {
        ToolOutcome::Success {
            data: serde_json::to_value(data).unwrap_or_default(),
            message: None,
        }
    }

    /// Success that only reports a message (e.g. "cancelled successfully").
    pub fn success_message(message: impl Into<String>) -> Self {
        ToolOutcome::Success {
            data: serde_json::Value::Null,
            message: Some(message.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ToolOutcome::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    /// Data of a successful outcome.
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            ToolOutcome::Success { data, .. } if !data.is_null() => Some(data),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ToolOutcome::Success { message, .. } => message.as_deref(),
            ToolOutcome::Failure { message } => Some(message),
        }
    }

    /// Flat JSON form `{ "success": bool, "data"?: ..., "message"?: ... }`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct OutcomeWire<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl Serialize for ToolOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OutcomeWire {
            success: self.is_success(),
            data: self.data(),
            message: self.message(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_serializes_without_data() {
        let json = ToolOutcome::failure("Order ORD999 not found").to_json();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Order ORD999 not found");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_success_message_only() {
        let outcome = ToolOutcome::success_message("done");
        assert!(outcome.is_success());
        assert!(outcome.data().is_none());
        let json = outcome.to_json();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "done");
    }
}
