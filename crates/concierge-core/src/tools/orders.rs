//! Order lookup, tracking and cancellation over an in-memory order book.
//!
//! Each order sits behind its own mutex: the cancel precondition check and
//! the status write happen under that lock, so two concurrent cancels of the
//! same order cannot both observe `processing`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::ToolOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub order_date: String,
    pub estimated_delivery: String,
}

pub struct OrderTools {
    orders: HashMap<String, Mutex<Order>>,
}

impl OrderTools {
    /// Order book seeded with the demo orders.
    pub fn new() -> Self {
        Self::with_orders(seed_orders())
    }

    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: orders
                .into_iter()
                .map(|o| (o.id.to_uppercase(), Mutex::new(o)))
                .collect(),
        }
    }

    fn slot(&self, order_id: &str) -> Option<&Mutex<Order>> {
        self.orders.get(&order_id.trim().to_uppercase())
    }

    pub async fn get_order_status(&self, order_id: &str) -> ToolOutcome {
        match self.slot(order_id) {
            Some(slot) => {
                let order = slot.lock().await;
                ToolOutcome::success(serde_json::json!({ "order": &*order }))
            }
            None => not_found(order_id),
        }
    }

    pub async fn track_order(&self, order_id: &str) -> ToolOutcome {
        let Some(slot) = self.slot(order_id) else {
            return not_found(order_id);
        };
        let order = slot.lock().await;
        match &order.tracking_number {
            Some(tracking_number) => ToolOutcome::success(serde_json::json!({
                "tracking_info": {
                    "tracking_number": tracking_number,
                    "status": order.status,
                    "estimated_delivery": order.estimated_delivery,
                }
            })),
            None => ToolOutcome::success_message(
                "Order is being processed. Tracking number will be available soon.",
            ),
        }
    }

    /// Cancel an order. Only permitted while the order is `processing`;
    /// any other status is reported and left unchanged.
    pub async fn cancel_order(&self, order_id: &str) -> ToolOutcome {
        let Some(slot) = self.slot(order_id) else {
            return not_found(order_id);
        };
        let mut order = slot.lock().await;
        if order.status != OrderStatus::Processing {
            return ToolOutcome::failure(format!(
                "Order {} cannot be cancelled (Status: {})",
                order_id, order.status
            ));
        }
        order.status = OrderStatus::Cancelled;
        tracing::info!("[OrderTools] Cancelled order {}", order.id);
        ToolOutcome::success_message(format!("Order {} has been cancelled successfully", order_id))
    }
}

impl Default for OrderTools {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(order_id: &str) -> ToolOutcome {
    ToolOutcome::failure(format!("Order {} not found", order_id))
}

fn seed_orders() -> Vec<Order> {
    vec![
        Order {
            id: "ORD001".to_string(),
            customer_id: "CUST001".to_string(),
            items: vec![OrderItem {
                name: "Laptop".to_string(),
                quantity: 1,
                price: 999.99,
            }],
            status: OrderStatus::Shipped,
            tracking_number: Some("TRK123456789".to_string()),
            order_date: "2024-01-15".to_string(),
            estimated_delivery: "2024-01-20".to_string(),
        },
        Order {
            id: "ORD002".to_string(),
            customer_id: "CUST002".to_string(),
            items: vec![OrderItem {
                name: "Phone".to_string(),
                quantity: 1,
                price: 699.99,
            }],
            status: OrderStatus::Processing,
            tracking_number: None,
            order_date: "2024-01-18".to_string(),
            estimated_delivery: "2024-01-25".to_string(),
        },
    ]
}
