//! FAQ answers and support tickets.
//!
//! Tickets are kept for the lifetime of the process; nothing evicts them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::ToolOutcome;

/// Contact address used when the caller did not supply one.
pub const DEFAULT_CUSTOMER_EMAIL: &str = "customer@email.com";

const FAQ: &[(&str, &str)] = &[
    (
        "shipping",
        "We offer free shipping on orders over $50. Standard shipping takes 3-5 business days.",
    ),
    (
        "returns",
        "You can return items within 30 days of purchase for a full refund.",
    ),
    (
        "warranty",
        "All electronics come with a 1-year manufacturer warranty.",
    ),
    (
        "payment",
        "We accept all major credit cards, PayPal, and Apple Pay.",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Escalated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub customer_email: String,
    pub issue_type: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: DateTime<Utc>,
}

struct TicketBook {
    next_number: u32,
    tickets: HashMap<String, Ticket>,
}

pub struct SupportTools {
    book: RwLock<TicketBook>,
}

impl SupportTools {
    pub fn new() -> Self {
        Self {
            book: RwLock::new(TicketBook {
                next_number: 1,
                tickets: HashMap::new(),
            }),
        }
    }

    /// Create a ticket with the next sequential id (`TICK0001`, `TICK0002`, ...).
    pub async fn create_support_ticket(
        &self,
        customer_email: &str,
        issue_type: &str,
        description: &str,
    ) -> ToolOutcome {
        let mut book = self.book.write().await;
        let ticket_id = format!("TICK{:04}", book.next_number);
        book.next_number += 1;

        let ticket = Ticket {
            id: ticket_id.clone(),
            customer_email: customer_email.to_string(),
            issue_type: issue_type.to_string(),
            description: description.to_string(),
            status: TicketStatus::Open,
            priority: TicketPriority::Medium,
            created_at: Utc::now(),
        };
        book.tickets.insert(ticket_id.clone(), ticket);

        tracing::info!(
            "[SupportTools] Created ticket {} (issue type: {})",
            ticket_id,
            issue_type
        );

        ToolOutcome::Success {
            data: serde_json::json!({ "ticket_id": ticket_id }),
            message: Some(format!("Support ticket {} created successfully", ticket_id)),
        }
    }

    /// Match a topic against the FAQ keys; a key hits when either string
    /// contains the other (`"return"` finds `returns`).
    pub async fn get_faq_answer(&self, topic: &str) -> ToolOutcome {
        let topic_lower = topic.trim().to_lowercase();
        if !topic_lower.is_empty() {
            for (key, answer) in FAQ {
                if topic_lower.contains(key) || key.contains(topic_lower.as_str()) {
                    return ToolOutcome::success(serde_json::json!({
                        "topic": key,
                        "answer": answer,
                    }));
                }
            }
        }
        ToolOutcome::failure(
            "FAQ topic not found. Available topics: shipping, returns, warranty, payment",
        )
    }

    /// Hand an existing ticket over to a human agent.
    pub async fn escalate_ticket(&self, ticket_id: &str) -> ToolOutcome {
        let mut book = self.book.write().await;
        match book.tickets.get_mut(ticket_id) {
            Some(ticket) => {
                ticket.status = TicketStatus::Escalated;
                ticket.priority = TicketPriority::High;
                ToolOutcome::success_message(format!(
                    "Ticket {} has been escalated to a human agent",
                    ticket_id
                ))
            }
            None => ToolOutcome::failure(format!("Ticket {} not found", ticket_id)),
        }
    }

    pub async fn get_ticket(&self, ticket_id: &str) -> Option<Ticket> {
        self.book.read().await.tickets.get(ticket_id).cloned()
    }

    pub async fn tickets(&self) -> Vec<Ticket> {
        let book = self.book.read().await;
        let mut tickets: Vec<Ticket> = book.tickets.values().cloned().collect();
        tickets.sort_by(|a, b| a.id.cmp(&b.id));
        tickets
    }

    pub async fn ticket_count(&self) -> usize {
        self.book.read().await.tickets.len()
    }
}

impl Default for SupportTools {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ticket_ids_are_sequential() {
        let tools = SupportTools::new();
        let first = tools
            .create_support_ticket(DEFAULT_CUSTOMER_EMAIL, "general_inquiry", "first")
            .await;
        let second = tools
            .create_support_ticket(DEFAULT_CUSTOMER_EMAIL, "escalated", "second")
            .await;
        assert_eq!(first.data().unwrap()["ticket_id"], "TICK0001");
        assert_eq!(second.data().unwrap()["ticket_id"], "TICK0002");
        assert_eq!(tools.ticket_count().await, 2);
    }

    #[tokio::test]
    async fn test_faq_matching() {
        let tools = SupportTools::new();
        let outcome = tools.get_faq_answer("Shipping times").await;
        assert_eq!(outcome.data().unwrap()["topic"], "shipping");

        let outcome = tools.get_faq_answer("return").await;
        assert_eq!(outcome.data().unwrap()["topic"], "returns");

        let outcome = tools.get_faq_answer("loyalty points").await;
        assert!(!outcome.is_success());
        assert!(tools.get_faq_answer("").await.message().unwrap().contains("Available topics"));
    }

    #[tokio::test]
    async fn test_escalate_existing_ticket() {
        let tools = SupportTools::new();
        tools
            .create_support_ticket(DEFAULT_CUSTOMER_EMAIL, "general_inquiry", "help")
            .await;
        assert!(tools.escalate_ticket("TICK0001").await.is_success());
        let ticket = tools.get_ticket("TICK0001").await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Escalated);
        assert_eq!(ticket.priority, TicketPriority::High);

        assert!(!tools.escalate_ticket("TICK0099").await.is_success());
    }
}
