use crate::auth::{bearer_token, password_matches};
use crate::errors::AppError;
use crate::models::{
    ChartQuery, LoginRequest, LoginResponse, NewTask, Task, TaskPatch, TaskResponse, TaskType,
};
use crate::state::AppState;
use crate::ui::render_index;
use crate::view::{redraw, Chart, Filters, ViewMode, ViewState};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::Html,
    Json,
};
use tracing::{info, warn};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.assignees, &state.task_types))
}

pub async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    Json(state.store.list().await)
}

pub async fn list_assignees(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.assignees.as_ref().clone())
}

pub async fn list_task_types(State(state): State<AppState>) -> Json<Vec<TaskType>> {
    Json(state.task_types.as_ref().clone())
}

/// The filtered task array, styles and popups the page hands to the widget.
pub async fn chart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ChartQuery>,
) -> Result<Json<Chart>, AppError> {
    let view_mode = match query.mode.as_deref() {
        Some(mode) => mode.parse::<ViewMode>().map_err(AppError::bad_request)?,
        None => ViewMode::default(),
    };

    let mut view = ViewState::new(
        state.store.list().await,
        state.assignees.as_ref().clone(),
        state.task_types.as_ref().clone(),
    );
    view.filters = Filters::from_query(&query, &state.task_types);
    view.view_mode = view_mode;
    view.edit_mode = state.has_session(&headers).await;

    Ok(Json(redraw(&view)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    let Json(payload) = payload?;
    if !password_matches(&state.config.admin_password, &payload.password) {
        warn!("rejected login attempt");
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                success: false,
                token: None,
            }),
        ));
    }

    let token = state.sessions.lock().await.issue();
    info!("edit session opened");
    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            token: Some(token),
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LoginResponse>, AppError> {
    let Some(token) = bearer_token(&headers) else {
        return Err(AppError::unauthorized("missing session token"));
    };
    if !state.sessions.lock().await.revoke(token) {
        return Err(AppError::unauthorized("unknown session token"));
    }
    info!("edit session closed");
    Ok(Json(LoginResponse {
        success: true,
        token: None,
    }))
}

pub async fn add_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<Json<TaskResponse>, AppError> {
    state.require_session(&headers).await?;
    let Json(new) = payload?;
    let task = state.store.add(new, state.default_task_type()).await?;
    Ok(Json(TaskResponse::success(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<TaskResponse>, AppError> {
    state.require_session(&headers).await?;
    let Json(patch) = payload?;
    let task = state.store.update(&patch).await?;
    Ok(Json(TaskResponse::success(task)))
}
