//! Workflow templates: a fixed, ordered list of handler steps.
//!
//! ```yaml
//! id: "order_fulfillment"
//! name: "Order Fulfillment"
//! description: "Check stock, place the order, confirm with the customer"
//! steps:
//!   - handler: "product"
//!     action: "check_availability"
//!   - handler: "order"
//!     action: "create_order"
//!   - handler: "support"
//!     action: "send_confirmation"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConciergeError, ConciergeResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Handler id (`order`, `product`, `support`, `weather`)
    pub handler: String,
    pub action: String,
}

impl WorkflowStep {
    pub fn new(handler: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            action: action.into(),
        }
    }

    /// Text sent to the handler when this step runs.
    pub fn query(&self) -> String {
        format!("Execute {}", self.action)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowTemplate {
    pub fn new(id: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            steps,
        }
    }

    pub fn from_yaml(yaml: &str) -> ConciergeResult<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ConciergeError::Template(format!("Failed to parse template YAML: {}", e)))
    }

    pub fn from_file(path: &Path) -> ConciergeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConciergeError::Template(format!(
                "Failed to read template file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }
}

/// Registry of workflow templates, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TemplateLoader {
    templates: HashMap<String, WorkflowTemplate>,
}

impl TemplateLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader pre-populated with the built-in templates.
    pub fn with_builtins() -> Self {
        let mut loader = Self::new();
        for template in Self::builtin_templates() {
            loader.insert(template);
        }
        loader
    }

    /// Register a template, replacing any with the same id.
    pub fn insert(&mut self, template: WorkflowTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    /// Load every `.yaml`/`.yml` file in `dir`. Any unreadable or invalid
    /// file fails the whole load.
    pub fn load_dir(&mut self, dir: &Path) -> ConciergeResult<usize> {
        if !dir.is_dir() {
            return Err(ConciergeError::Template(format!(
                "Template directory '{}' does not exist",
                dir.display()
            )));
        }

        let entries = std::fs::read_dir(dir).map_err(|e| {
            ConciergeError::Template(format!(
                "Failed to read directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let mut count = 0;
        for entry in entries {
            let entry = entry
                .map_err(|e| ConciergeError::Template(format!("Directory entry error: {}", e)))?;
            let path = entry.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some("yaml") | Some("yml") => {}
                _ => continue,
            }

            let template = WorkflowTemplate::from_file(&path)?;
            tracing::info!(
                "[TemplateLoader] Loaded template: {} ({} steps)",
                template.id,
                template.steps.len()
            );
            self.insert(template);
            count += 1;
        }

        Ok(count)
    }

    pub fn get(&self, id: &str) -> Option<&WorkflowTemplate> {
        self.templates.get(id)
    }

    pub fn all(&self) -> &HashMap<String, WorkflowTemplate> {
        &self.templates
    }

    pub fn builtin_templates() -> Vec<WorkflowTemplate> {
        vec![
            WorkflowTemplate {
                id: "order_fulfillment".to_string(),
                name: Some("Order Fulfillment".to_string()),
                description: Some("Check stock, place the order, confirm with the customer".to_string()),
                steps: vec![
                    WorkflowStep::new("product", "check_availability"),
                    WorkflowStep::new("order", "create_order"),
                    WorkflowStep::new("support", "send_confirmation"),
                ],
            },
            WorkflowTemplate {
                id: "issue_resolution".to_string(),
                name: Some("Issue Resolution".to_string()),
                description: Some("Open a ticket, look up the order, propose a fix".to_string()),
                steps: vec![
                    WorkflowStep::new("support", "create_ticket"),
                    WorkflowStep::new("order", "check_order_status"),
                    WorkflowStep::new("support", "provide_solution"),
                ],
            },
        ]
    }
}
