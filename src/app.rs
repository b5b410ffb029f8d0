use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/tasks", get(handlers::list_tasks))
        .route("/api/assignees", get(handlers::list_assignees))
        .route("/api/task-types", get(handlers::list_task_types))
        .route("/api/chart", get(handlers::chart))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .route("/api/add-task", post(handlers::add_task))
        .route("/api/update-task", post(handlers::update_task))
        .with_state(state)
}
