//! Concierge Core - classification-driven dispatch of customer requests.
//!
//! A free-text query is classified by an external text-completion engine,
//! routed to one of four specialist handlers (orders, products, support,
//! weather), turned into a domain tool call, and rendered back into a reply.
//! Multi-step workflows drive the same handlers through fixed templates.
//!
//! ```text
//! query ──► Router ──► Handler ──► Tool adapter ──► HandlerResult
//!             │           │
//!             └── Classifier (ClassificationPort, bounded by a timeout)
//!
//! WorkflowEngine ──► SessionStore
//!        └──────► Router handlers, one step per advance
//! ```
//!
//! Every classifier reply is treated as untrusted input: prose, truncated JSON,
//! timeouts, and unknown ids all degrade to help text or the support handler.

pub mod classify;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod tools;
pub mod workflow;

// Convenience re-exports
pub use classify::{ClassificationPort, Classifier, HttpClassificationPort, ParsedReply, ScriptedPort};
pub use config::ConciergeConfig;
pub use error::{ConciergeError, ConciergeResult};
pub use handlers::{Handler, HandlerKind};
pub use models::{Capability, HandlerResult, HistoryEntry, QueryContext, RoutingDecision};
pub use router::Router;
pub use state::{Concierge, ConciergeInner};
pub use tools::ToolOutcome;
pub use workflow::{StepReport, WorkflowEngine, WorkflowStatus};
