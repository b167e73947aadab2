//! Workflow engine - runs template steps one `advance` at a time.
//!
//! ```text
//! start ──► Running(0) ──advance──► Running(1) ──advance──► ... ──► Completed
//!                                                                     │
//!                                                 advance (no-op) ◄───┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::schema::{TemplateLoader, WorkflowStep};
use super::session_store::{SessionStore, WorkflowSession};
use crate::error::{ConciergeError, ConciergeResult};
use crate::models::{HandlerResult, QueryContext};
use crate::router::Router;

/// Outcome of one `advance` call.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StepReport {
    StepCompleted {
        step: WorkflowStep,
        result: HandlerResult,
        has_next: bool,
    },
    Completed {
        results: Vec<HandlerResult>,
    },
}

impl StepReport {
    pub fn is_completed(&self) -> bool {
        matches!(self, StepReport::Completed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatus {
    pub template_id: String,
    pub cursor: usize,
    pub total_steps: usize,
    pub progress_percent: f64,
    pub completed: bool,
    pub results: Vec<HandlerResult>,
}

pub struct WorkflowEngine {
    router: Arc<Router>,
    templates: TemplateLoader,
    sessions: Arc<SessionStore>,
}

impl WorkflowEngine {
    pub fn new(router: Arc<Router>, templates: TemplateLoader, sessions: Arc<SessionStore>) -> Self {
        Self {
            router,
            templates,
            sessions,
        }
    }

    pub fn templates(&self) -> &TemplateLoader {
        &self.templates
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Create a session for `template_id` and run its first step.
    /// An existing session with the same id is replaced.
    pub async fn start(
        &self,
        template_id: &str,
        session_id: &str,
        initial_data: HashMap<String, serde_json::Value>,
    ) -> ConciergeResult<StepReport> {
        let template = self
            .templates
            .get(template_id)
            .ok_or_else(|| ConciergeError::UnknownTemplate(template_id.to_string()))?;

        let (_, previous) = self
            .sessions
            .insert(session_id, WorkflowSession::new(template, initial_data))
            .await;

        if previous.is_some() {
            tracing::info!("[Workflow] Replaced existing session '{}'", session_id);
        }
        tracing::info!(
            "[Workflow] Started '{}' for session '{}' ({} steps)",
            template_id,
            session_id,
            template.steps.len()
        );

        self.advance(session_id).await
    }

    /// Run the step at the session's cursor. Completed sessions report their
    /// results unchanged.
    pub async fn advance(&self, session_id: &str) -> ConciergeResult<StepReport> {
        let handle = self
            .sessions
            .get(session_id)
            .await
            .ok_or_else(|| ConciergeError::SessionNotFound(session_id.to_string()))?;

        let mut session = handle.lock().await;

        let Some(step) = session.current_step().cloned() else {
            return Ok(StepReport::Completed {
                results: session.results.clone(),
            });
        };

        let handler = self
            .router
            .handler_by_id(&step.handler)
            .ok_or_else(|| ConciergeError::UnknownHandler(step.handler.clone()))?;

        tracing::info!(
            "[Workflow] Session '{}' step {}/{}: {} -> {}",
            session_id,
            session.cursor + 1,
            session.steps.len(),
            handler.name(),
            step.action
        );

        let context = QueryContext::with_data(session.carried_data.clone());
        let result = handler.process(&step.query(), &context).await;

        session.results.push(result.clone());
        session.cursor += 1;

        if session.is_completed() {
            tracing::info!("[Workflow] Session '{}' completed", session_id);
        }

        Ok(StepReport::StepCompleted {
            step,
            result,
            has_next: !session.is_completed(),
        })
    }

    pub async fn status(&self, session_id: &str) -> ConciergeResult<WorkflowStatus> {
        let handle = self
            .sessions
            .get(session_id)
            .await
            .ok_or_else(|| ConciergeError::SessionNotFound(session_id.to_string()))?;
        let session = handle.lock().await;

        Ok(WorkflowStatus {
            template_id: session.template_id.clone(),
            cursor: session.cursor,
            total_steps: session.steps.len(),
            progress_percent: session.progress_percent(),
            completed: session.is_completed(),
            results: session.results.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::classify::{Classifier, ScriptedPort};
    use crate::config::WeatherConfig;
    use crate::workflow::WorkflowTemplate;

    fn engine(templates: TemplateLoader) -> WorkflowEngine {
        let classifier = Classifier::new(Arc::new(ScriptedPort::new("")), Duration::from_secs(1));
        let router = Arc::new(Router::new(classifier, WeatherConfig::default()));
        WorkflowEngine::new(router, templates, Arc::new(SessionStore::new()))
    }

    #[tokio::test]
    async fn test_unknown_template() {
        let engine = engine(TemplateLoader::with_builtins());
        let err = engine.start("nope", "s1", HashMap::new()).await.unwrap_err();
        assert!(matches!(err, ConciergeError::UnknownTemplate(_)));
        assert!(engine.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_handler_leaves_state_untouched() {
        let mut templates = TemplateLoader::new();
        templates.insert(WorkflowTemplate::new(
            "bad",
            vec![WorkflowStep::new("billing", "charge")],
        ));
        let engine = engine(templates);

        let err = engine.start("bad", "s1", HashMap::new()).await.unwrap_err();
        assert!(matches!(err, ConciergeError::UnknownHandler(ref h) if h == "billing"));

        let status = engine.status("s1").await.unwrap();
        assert_eq!(status.cursor, 0);
        assert!(status.results.is_empty());
    }

    #[tokio::test]
    async fn test_zero_step_template() {
        let mut templates = TemplateLoader::new();
        templates.insert(WorkflowTemplate::new("empty", Vec::new()));
        let engine = engine(templates);

        let report = engine.start("empty", "s1", HashMap::new()).await.unwrap();
        assert!(report.is_completed());
        let status = engine.status("s1").await.unwrap();
        assert_eq!(status.progress_percent, 100.0);
        assert!(status.completed);
    }

    #[tokio::test]
    async fn test_report_json_shape() {
        let mut templates = TemplateLoader::new();
        templates.insert(WorkflowTemplate::new(
            "two",
            vec![
                WorkflowStep::new("support", "faq_answer"),
                WorkflowStep::new("support", "faq_answer"),
            ],
        ));
        let engine = engine(templates);

        let report = engine.start("two", "s1", HashMap::new()).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "step_completed");
        assert_eq!(json["hasNext"], true);
        assert!(json.get("has_next").is_none());
        assert_eq!(json["result"]["handlerName"], "Support Agent");

        engine.advance("s1").await.unwrap();
        let json = serde_json::to_value(engine.advance("s1").await.unwrap()).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["results"].as_array().unwrap().len(), 2);

        let status = serde_json::to_value(engine.status("s1").await.unwrap()).unwrap();
        assert_eq!(status["progressPercent"], 100.0);
    }

    #[tokio::test]
    async fn test_advance_missing_session() {
        let engine = engine(TemplateLoader::with_builtins());
        let err = engine.advance("ghost").await.unwrap_err();
        assert!(matches!(err, ConciergeError::SessionNotFound(_)));
        assert!(engine.status("ghost").await.is_err());
    }
}
