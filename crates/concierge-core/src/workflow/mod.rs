//! Workflow engine - fixed multi-step handler sequences.
//!
//! # Architecture
//!
//! ```text
//! templates/*.yaml ──► WorkflowTemplate ──► TemplateLoader
//!                                               │
//!                       start / advance ──► WorkflowEngine ──► Router handlers
//!                                               │
//!                                          SessionStore
//! ```

pub mod engine;
pub mod schema;
pub mod session_store;

pub use engine::{StepReport, WorkflowEngine, WorkflowStatus};
pub use schema::{TemplateLoader, WorkflowStep, WorkflowTemplate};
pub use session_store::{SessionHandle, SessionStore, WorkflowSession};
