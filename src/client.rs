//! HTTP client for the board: loads the collections, keeps a local mirror in a
//! [`ViewState`] and patches it optimistically before telling the server.

use crate::models::{LoginRequest, LoginResponse, NewTask, Task, TaskId, TaskPatch, TaskResponse, TaskType};
use crate::popup::FieldEdit;
use crate::view::{redraw, Chart, ViewState};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug)]
pub enum ClientError {
    Http(reqwest::Error),
    Status { status: u16, message: String },
    MissingFields(Vec<&'static str>),
    InvalidEdit(String),
    Locked,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "request failed: {err}"),
            Self::Status { status, message } => write!(f, "server answered {status}: {message}"),
            Self::MissingFields(fields) => {
                write!(f, "Missing Mandatory Fields ({})", fields.join(", "))
            }
            Self::InvalidEdit(message) => write!(f, "invalid edit: {message}"),
            Self::Locked => f.write_str("editing is locked"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

pub struct GanttClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    pub view: ViewState,
}

impl GanttClient {
    /// Fetches tasks, assignees and task types in parallel.
    pub async fn connect(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let mut client = Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            view: ViewState::default(),
        };
        client.reload().await?;
        Ok(client)
    }

    pub async fn reload(&mut self) -> Result<(), ClientError> {
        let (tasks, developers, task_types) = tokio::try_join!(
            self.get_json::<Vec<Task>>("/api/tasks"),
            self.get_json::<Vec<String>>("/api/assignees"),
            self.get_json::<Vec<TaskType>>("/api/task-types"),
        )?;
        let mut view = ViewState::new(tasks, developers, task_types);
        view.edit_mode = self.view.edit_mode;
        view.view_mode = self.view.view_mode;
        self.view = view;
        Ok(())
    }

    pub fn is_unlocked(&self) -> bool {
        self.view.edit_mode
    }

    /// Returns false (and stays locked) on a wrong password.
    pub async fn login(&mut self, password: &str) -> Result<bool, ClientError> {
        let response = self
            .http
            .post(self.url("/api/login"))
            .json(&LoginRequest {
                password: password.to_string(),
            })
            .send()
            .await?;
        let body: LoginResponse = response.json().await?;
        if body.success {
            self.token = body.token;
            self.view.edit_mode = true;
        }
        Ok(body.success)
    }

    pub async fn logout(&mut self) -> Result<(), ClientError> {
        self.view.edit_mode = false;
        if self.token.is_some() {
            let response = self.authorized(self.http.post(self.url("/api/logout"))).send().await?;
            self.token = None;
            check_status(response).await?;
        }
        Ok(())
    }

    pub async fn add_task(&mut self, new: NewTask) -> Result<Task, ClientError> {
        if !self.view.edit_mode {
            return Err(ClientError::Locked);
        }
        let missing = new.missing_fields();
        if !missing.is_empty() {
            return Err(ClientError::MissingFields(missing));
        }
        let response = self
            .authorized(self.http.post(self.url("/api/add-task")))
            .json(&new)
            .send()
            .await?;
        let body: TaskResponse = check_status(response).await?.json().await?;
        self.view.upsert(body.task.clone());
        Ok(body.task)
    }

    /// Applies a popup edit locally, then sends it. Send failures are only
    /// logged; the mirror keeps the edit.
    pub async fn update_generic(&mut self, id: TaskId, edit: FieldEdit) -> Result<(), ClientError> {
        let patch = self
            .view
            .edit_field(id, edit)
            .map_err(ClientError::InvalidEdit)?
            .ok_or(ClientError::Locked)?;
        self.send_update(&patch).await;
        Ok(())
    }

    pub async fn drag_dates(
        &mut self,
        id: TaskId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        let patch = self.view.drag_dates(id, start, end).ok_or(ClientError::Locked)?;
        self.send_update(&patch).await;
        Ok(())
    }

    pub async fn drag_progress(&mut self, id: TaskId, progress: f64) -> Result<(), ClientError> {
        let patch = self.view.drag_progress(id, progress).ok_or(ClientError::Locked)?;
        self.send_update(&patch).await;
        Ok(())
    }

    pub fn chart(&self) -> Chart {
        redraw(&self.view)
    }

    async fn send_update(&self, patch: &TaskPatch) {
        match self.post_update(patch).await {
            Ok(_) => info!(id = %patch.id, "update sent"),
            Err(err) => warn!(id = %patch.id, "update failed: {err}"),
        }
    }

    async fn post_update(&self, patch: &TaskPatch) -> Result<Response, ClientError> {
        let response = self
            .authorized(self.http.post(self.url("/api/update-task")))
            .json(patch)
            .send()
            .await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http.get(self.url(path)).send().await?;
        Ok(check_status(response).await?.json().await?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
