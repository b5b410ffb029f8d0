use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_ASSIGNEE: &str = "Unassigned";
pub const DEFAULT_TASK_TYPE: &str = "Frontend";
pub const DISPLAY_ID_PREFIX: &str = "task-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(TaskId)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts `7`, `"7"`, `" 7 "` and the chart's display form `"task-7"`.
impl FromStr for TaskId {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix(DISPLAY_ID_PREFIX).unwrap_or(trimmed);
        match digits.parse::<u64>() {
            Ok(0) | Err(_) => Err(format!("invalid task id '{raw}': expected a positive integer")),
            Ok(value) => Ok(TaskId(value)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawId::deserialize(deserializer)? {
            RawId::Number(0) => Err(de::Error::custom("task id must be a positive integer")),
            RawId::Number(value) => Ok(TaskId(value)),
            RawId::Text(text) => text.parse().map_err(de::Error::custom),
        }
    }
}

/// Blank strings and `null` both mean "no id supplied".
fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<TaskId>, D::Error> {
    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawId::Text(text)) => text.parse().map(Some).map_err(de::Error::custom),
        Some(RawId::Number(0)) => Err(de::Error::custom("task id must be a positive integer")),
        Some(RawId::Number(value)) => Ok(Some(TaskId(value))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProgress {
    Number(f64),
    Text(String),
}

fn progress_value<E: de::Error>(raw: RawProgress) -> Result<u8, E> {
    let value = match raw {
        RawProgress::Number(value) => value,
        RawProgress::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| E::custom(format!("invalid progress '{text}'")))?,
    };
    if !(0.0..=100.0).contains(&value) {
        return Err(E::custom("progress must be between 0 and 100"));
    }
    Ok(value.round() as u8)
}

fn progress<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    progress_value(RawProgress::deserialize(deserializer)?)
}

fn optional_progress<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
    Option::<RawProgress>::deserialize(deserializer)?
        .map(progress_value::<D::Error>)
        .transpose()
}

/// Blank strings and `null` both mean "no date supplied".
fn optional_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) => parse_date(&text).map(Some).map_err(de::Error::custom),
    }
}

pub fn parse_date(text: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{text}': expected YYYY-MM-DD"))
}

/// The ids a task depends on.
///
/// Stored and exchanged as the comma-separated text `"1, 4"` so existing data
/// files keep loading; in memory it is an ordered set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies(BTreeSet<TaskId>);

impl Dependencies {
    pub fn parse(text: &str) -> Result<Self, String> {
        text.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(TaskId::from_str)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Dependencies)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<TaskId> for Dependencies {
    fn from_iter<I: IntoIterator<Item = TaskId>>(iter: I) -> Self {
        Dependencies(iter.into_iter().collect())
    }
}

impl fmt::Display for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, id) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

impl Serialize for Dependencies {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDependencies {
    Text(String),
    Single(u64),
    List(Vec<TaskId>),
}

impl<'de> Deserialize<'de> for Dependencies {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<RawDependencies>::deserialize(deserializer)? {
            None => Ok(Dependencies::default()),
            Some(RawDependencies::Text(text)) => Dependencies::parse(&text).map_err(de::Error::custom),
            Some(RawDependencies::Single(value)) => Dependencies::parse(&value.to_string()).map_err(de::Error::custom),
            Some(RawDependencies::List(ids)) => Ok(ids.into_iter().collect()),
        }
    }
}

fn default_assignee() -> String {
    DEFAULT_ASSIGNEE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default, deserialize_with = "progress")]
    pub progress: u8,
    #[serde(default = "default_assignee")]
    pub assignee: String,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub task_url: String,
    /// Keys this server does not know about, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Shallow merge: every field present in the patch replaces the stored one.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(start) = patch.start {
            self.start = start;
        }
        if let Some(end) = patch.end {
            self.end = end;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress;
        }
        if let Some(assignee) = &patch.assignee {
            self.assignee = assignee.clone();
        }
        if let Some(task_type) = &patch.task_type {
            self.task_type = task_type.clone();
        }
        if let Some(dependencies) = &patch.dependencies {
            self.dependencies = dependencies.clone();
        }
        if let Some(desc) = &patch.desc {
            self.desc = desc.clone();
        }
        if let Some(task_url) = &patch.task_url {
            self.task_url = task_url.clone();
        }
        for (key, value) in &patch.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskType {
    pub name: String,
    pub color: String,
}

impl TaskType {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

pub fn default_assignees() -> Vec<String> {
    vec![DEFAULT_ASSIGNEE.to_string()]
}

pub fn default_task_types() -> Vec<TaskType> {
    vec![
        TaskType::new("Frontend", "#3498db"),
        TaskType::new("Backend", "#9b59b6"),
    ]
}

/// Body of `POST /api/add-task`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    #[serde(default, deserialize_with = "optional_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "optional_date", skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_date", skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_progress", skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Dependencies>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewTask {
    pub fn new(name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            name: Some(name.into()),
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    /// Names of the mandatory fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.as_deref().is_none_or(|name| name.trim().is_empty()) {
            missing.push("name");
        }
        if self.start.is_none() {
            missing.push("start");
        }
        if self.end.is_none() {
            missing.push("end");
        }
        missing
    }
}

/// Body of `POST /api/update-task`: an id plus any subset of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "optional_date", skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_date", skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_progress", skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Dependencies>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskPatch {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            name: None,
            start: None,
            end: None,
            progress: None,
            assignee: None,
            task_type: None,
            dependencies: None,
            desc: None,
            task_url: None,
            extra: Map::new(),
        }
    }

    pub fn dates(id: TaskId, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::new(id)
        }
    }

    pub fn progress(id: TaskId, progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Self::new(id)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub status: String,
    pub task: Task,
}

impl TaskResponse {
    pub fn success(task: Task) -> Self {
        Self {
            status: "success".to_string(),
            task,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub assignee: Option<String>,
    /// Comma-separated type names, each percent-encoded; absent means every
    /// type, empty means none.
    pub types: Option<String>,
    pub mode: Option<String>,
}
