//! Shared concierge state: one Router plus the Workflow Engine that drives it.

use std::path::Path;
use std::sync::Arc;

use crate::classify::{ClassificationPort, Classifier, HttpClassificationPort};
use crate::config::ConciergeConfig;
use crate::error::ConciergeResult;
use crate::models::{HandlerResult, QueryContext};
use crate::router::Router;
use crate::workflow::{SessionStore, TemplateLoader, WorkflowEngine};

pub struct ConciergeInner {
    pub config: ConciergeConfig,
    pub router: Arc<Router>,
    pub workflows: WorkflowEngine,
}

pub type Concierge = Arc<ConciergeInner>;

impl ConciergeInner {
    /// Build against an explicit classification port. Templates from
    /// `workflows.template_dir` are loaded on top of the built-ins.
    pub fn new(config: ConciergeConfig, port: Arc<dyn ClassificationPort>) -> ConciergeResult<Self> {
        let classifier = Classifier::new(port, config.classifier.timeout());
        let router = Arc::new(Router::new(classifier, config.weather.clone()));

        let mut templates = TemplateLoader::with_builtins();
        if let Some(dir) = config.workflows.template_dir.as_deref() {
            let count = templates.load_dir(Path::new(dir))?;
            tracing::info!("[Concierge] Loaded {} workflow templates from '{}'", count, dir);
        }

        let workflows = WorkflowEngine::new(router.clone(), templates, Arc::new(SessionStore::new()));

        Ok(Self {
            config,
            router,
            workflows,
        })
    }

    /// Build with the HTTP chat-completions port described by `config.classifier`.
    pub fn from_config(config: ConciergeConfig) -> ConciergeResult<Self> {
        let port = Arc::new(HttpClassificationPort::new(config.classifier.clone()));
        tracing::info!(
            "[Concierge] Using classification model '{}' at {}",
            port.model(),
            config.classifier.base_url
        );
        Self::new(config, port)
    }

    pub async fn route(&self, query: &str, context: &QueryContext) -> HandlerResult {
        self.router.route(query, context).await
    }
}
