//! Chart view model: filters, the local task mirror and the task array handed
//! to the Gantt widget. `redraw` is a pure function of the state.

use crate::models::{ChartQuery, Task, TaskId, TaskPatch, TaskType, DISPLAY_ID_PREFIX};
use crate::palette::{task_class, type_styles};
use crate::popup::{FieldEdit, Popup};
use chrono::{DateTime, NaiveDate, Utc};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    #[serde(rename = "Quarter Day")]
    QuarterDay,
    #[serde(rename = "Half Day")]
    HalfDay,
    Day,
    #[default]
    Week,
    Month,
}

impl ViewMode {
    pub const ALL: [ViewMode; 5] = [
        ViewMode::QuarterDay,
        ViewMode::HalfDay,
        ViewMode::Day,
        ViewMode::Week,
        ViewMode::Month,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::QuarterDay => "Quarter Day",
            ViewMode::HalfDay => "Half Day",
            ViewMode::Day => "Day",
            ViewMode::Week => "Week",
            ViewMode::Month => "Month",
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
        ViewMode::ALL
            .into_iter()
            .find(|mode| mode.label().replace(' ', "").eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unknown view mode '{raw}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssigneeFilter {
    #[default]
    All,
    Only(String),
}

impl AssigneeFilter {
    /// `"All"` (the dropdown's catch-all entry) and blank select everyone.
    pub fn from_selection(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == "All" {
            AssigneeFilter::All
        } else {
            AssigneeFilter::Only(value.to_string())
        }
    }

    pub fn matches(&self, assignee: &str) -> bool {
        match self {
            AssigneeFilter::All => true,
            AssigneeFilter::Only(name) => name == assignee,
        }
    }
}

/// The task-type checkboxes plus their "select all" box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeChecklist {
    names: Vec<String>,
    checked: BTreeSet<String>,
    all_checked: bool,
}

impl TypeChecklist {
    /// Starts with every type checked.
    pub fn new(types: &[TaskType]) -> Self {
        let mut names: Vec<String> = Vec::with_capacity(types.len());
        for task_type in types {
            if !names.contains(&task_type.name) {
                names.push(task_type.name.clone());
            }
        }
        let mut checklist = Self {
            checked: names.iter().cloned().collect(),
            names,
            all_checked: false,
        };
        checklist.sync();
        checklist
    }

    pub fn set(&mut self, name: &str, checked: bool) {
        if !self.names.iter().any(|known| known == name) {
            return;
        }
        if checked {
            self.checked.insert(name.to_string());
        } else {
            self.checked.remove(name);
        }
        self.sync();
    }

    pub fn set_all(&mut self, checked: bool) {
        self.checked = if checked {
            self.names.iter().cloned().collect()
        } else {
            BTreeSet::new()
        };
        self.sync();
    }

    /// Checks exactly the given names (unknown ones are ignored).
    pub fn check_only<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        self.set_all(false);
        for name in names {
            self.set(name.trim(), true);
        }
    }

    pub fn is_checked(&self, name: &str) -> bool {
        self.checked.contains(name)
    }

    pub fn all_checked(&self) -> bool {
        self.all_checked
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn sync(&mut self) {
        self.all_checked = self.checked.len() == self.names.len();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub assignee: AssigneeFilter,
    pub types: TypeChecklist,
}

impl Filters {
    pub fn new(types: &[TaskType]) -> Self {
        Self {
            assignee: AssigneeFilter::All,
            types: TypeChecklist::new(types),
        }
    }

    pub fn from_query(query: &ChartQuery, types: &[TaskType]) -> Self {
        let mut filters = Self::new(types);
        if let Some(assignee) = &query.assignee {
            filters.assignee = AssigneeFilter::from_selection(assignee);
        }
        if let Some(selected) = &query.types {
            let names = parse_type_list(selected);
            filters.types.check_only(names.iter().map(String::as_str));
        }
        filters
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.assignee.matches(&task.assignee) && self.types.is_checked(&task.task_type)
    }
}

/// Splits a `types` query value on `,`. Each name is percent-encoded by the
/// page, so names that contain a comma survive the split.
pub fn parse_type_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| percent_decode_str(part).decode_utf8_lossy().into_owned())
        .filter(|name| !name.trim().is_empty())
        .collect()
}

/// One bar as the Gantt widget expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttTask {
    pub id: String,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub progress: u8,
    pub dependencies: String,
    pub custom_class: String,
    #[serde(rename = "_originalId")]
    pub original_id: TaskId,
    pub popup_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub view_mode: ViewMode,
    pub readonly: bool,
    pub all_types_checked: bool,
    pub styles: String,
    pub tasks: Vec<GanttTask>,
}

/// Prefixes a raw id for the widget; already-prefixed ids pass through.
pub fn display_id(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with(DISPLAY_ID_PREFIX) {
        raw.to_string()
    } else {
        format!("{DISPLAY_ID_PREFIX}{raw}")
    }
}

/// Calendar date of a widget timestamp, in UTC.
pub fn canonical_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

pub fn visible_tasks<'a>(tasks: &'a [Task], filters: &Filters) -> Vec<&'a Task> {
    tasks.iter().filter(|task| filters.matches(task)).collect()
}

/// Only dependencies on visible tasks are drawn; the task itself is untouched.
pub fn rendered_dependencies(task: &Task, visible: &HashSet<TaskId>) -> String {
    task.dependencies
        .iter()
        .filter(|dep| visible.contains(dep))
        .map(|dep| display_id(&dep.to_string()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub tasks: Vec<Task>,
    pub developers: Vec<String>,
    pub task_types: Vec<TaskType>,
    pub filters: Filters,
    pub edit_mode: bool,
    pub view_mode: ViewMode,
}

impl ViewState {
    pub fn new(tasks: Vec<Task>, developers: Vec<String>, task_types: Vec<TaskType>) -> Self {
        Self {
            filters: Filters::new(&task_types),
            tasks,
            developers,
            task_types,
            edit_mode: false,
            view_mode: ViewMode::default(),
        }
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Adds `task` to the mirror, replacing any entry with the same id.
    pub fn upsert(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }

    /// Patches the local mirror. Returns false if the task is not mirrored.
    pub fn apply_patch(&mut self, patch: &TaskPatch) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == patch.id) {
            Some(task) => {
                task.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn drag_dates(
        &mut self,
        id: TaskId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<TaskPatch> {
        let patch = TaskPatch::dates(id, canonical_date(start), canonical_date(end));
        self.apply_if_editable(patch)
    }

    pub fn drag_progress(&mut self, id: TaskId, progress: f64) -> Option<TaskPatch> {
        let progress = progress.round().clamp(0.0, 100.0) as u8;
        self.apply_if_editable(TaskPatch::progress(id, progress))
    }

    /// Turns one popup control change into a patch and applies it locally.
    pub fn edit_field(&mut self, id: TaskId, edit: FieldEdit) -> Result<Option<TaskPatch>, String> {
        let patch = edit.into_patch(id)?;
        Ok(self.apply_if_editable(patch))
    }

    fn apply_if_editable(&mut self, patch: TaskPatch) -> Option<TaskPatch> {
        if !self.edit_mode {
            return None;
        }
        self.apply_patch(&patch).then_some(patch)
    }
}

pub fn redraw(state: &ViewState) -> Chart {
    let visible = visible_tasks(&state.tasks, &state.filters);
    let visible_ids: HashSet<TaskId> = visible.iter().map(|task| task.id).collect();

    let tasks = visible
        .iter()
        .map(|task| GanttTask {
            id: display_id(&task.id.to_string()),
            name: task.name.clone(),
            start: task.start,
            end: task.end,
            progress: task.progress,
            dependencies: rendered_dependencies(task, &visible_ids),
            custom_class: task_class(&task.task_type),
            original_id: task.id,
            popup_html: Popup::build(state, task).to_html(),
        })
        .collect();

    Chart {
        view_mode: state.view_mode,
        readonly: !state.edit_mode,
        all_types_checked: state.filters.types.all_checked(),
        styles: type_styles(&state.task_types),
        tasks,
    }
}
