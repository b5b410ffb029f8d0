use crate::auth::{bearer_token, Sessions};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{default_assignees, default_task_types, TaskType, DEFAULT_TASK_TYPE};
use crate::storage::load_collection;
use crate::store::SharedStore;
use axum::http::HeaderMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: SharedStore,
    pub assignees: Arc<Vec<String>>,
    pub task_types: Arc<Vec<TaskType>>,
    pub sessions: Arc<Mutex<Sessions>>,
}

impl AppState {
    pub async fn load(config: Config) -> Self {
        let store = SharedStore::load(config.tasks_path()).await;

        let mut assignees: Vec<String> = load_collection(&config.assignees_path()).await;
        if assignees.is_empty() {
            assignees = default_assignees();
        }
        let mut task_types: Vec<TaskType> = load_collection(&config.task_types_path()).await;
        if task_types.is_empty() {
            task_types = default_task_types();
        }

        Self {
            sessions: Arc::new(Mutex::new(Sessions::new(config.session_ttl))),
            config: Arc::new(config),
            store,
            assignees: Arc::new(assignees),
            task_types: Arc::new(task_types),
        }
    }

    /// Type given to new tasks that do not name one.
    pub fn default_task_type(&self) -> &str {
        self.task_types
            .first()
            .map(|task_type| task_type.name.as_str())
            .unwrap_or(DEFAULT_TASK_TYPE)
    }

    pub async fn has_session(&self, headers: &HeaderMap) -> bool {
        match bearer_token(headers) {
            Some(token) => self.sessions.lock().await.is_valid(token),
            None => false,
        }
    }

    pub async fn require_session(&self, headers: &HeaderMap) -> Result<(), AppError> {
        if self.has_session(headers).await {
            Ok(())
        } else {
            Err(AppError::unauthorized("editing requires a valid session token"))
        }
    }
}
