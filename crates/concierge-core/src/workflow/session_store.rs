//! In-memory session store for workflow runs.
//!
//! The id map sits behind a `RwLock` held only for insert/lookup/remove;
//! each session carries its own `Mutex` so steps on different sessions run
//! independently while overlapping steps on one session serialise.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::schema::{WorkflowStep, WorkflowTemplate};
use crate::models::HandlerResult;

/// One running (or finished) instance of a template.
#[derive(Debug, Clone)]
pub struct WorkflowSession {
    pub template_id: String,
    /// Snapshot of the template's steps at start time
    pub steps: Vec<WorkflowStep>,
    pub cursor: usize,
    /// Initial data handed to every step
    pub carried_data: HashMap<String, serde_json::Value>,
    pub results: Vec<HandlerResult>,
}

impl WorkflowSession {
    pub fn new(template: &WorkflowTemplate, carried_data: HashMap<String, serde_json::Value>) -> Self {
        Self {
            template_id: template.id.clone(),
            steps: template.steps.clone(),
            cursor: 0,
            carried_data,
            results: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    pub fn current_step(&self) -> Option<&WorkflowStep> {
        self.steps.get(self.cursor)
    }

    /// Completion percentage; a template with no steps is always 100.
    pub fn progress_percent(&self) -> f64 {
        if self.steps.is_empty() {
            100.0
        } else {
            self.cursor.min(self.steps.len()) as f64 / self.steps.len() as f64 * 100.0
        }
    }
}

pub type SessionHandle = Arc<Mutex<WorkflowSession>>;

pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Store `session` under `id`, returning the session it replaced.
    pub async fn insert(&self, id: &str, session: WorkflowSession) -> (SessionHandle, Option<SessionHandle>) {
        let handle = Arc::new(Mutex::new(session));
        let previous = self
            .sessions
            .write()
            .await
            .insert(id.to_string(), handle.clone());
        (handle, previous)
    }

    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.write().await.remove(id)
    }

    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
