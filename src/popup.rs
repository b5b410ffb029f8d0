//! Task detail popup: the per-field edit form shown when a bar is clicked.

use crate::models::{Dependencies, Task, TaskId, TaskPatch};
use crate::view::ViewState;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// One edit committed from a popup control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Progress(u8),
    TaskType(String),
    Assignee(String),
    TaskUrl(String),
    /// Selected values of the dependency multi-select, `""` being "(None)".
    Dependencies(Vec<String>),
    Desc(String),
}

impl FieldEdit {
    pub fn into_patch(self, id: TaskId) -> Result<TaskPatch, String> {
        let mut patch = TaskPatch::new(id);
        match self {
            FieldEdit::Progress(progress) if progress > 100 => {
                return Err("progress must be between 0 and 100".to_string());
            }
            FieldEdit::Progress(progress) => patch.progress = Some(progress),
            FieldEdit::TaskType(task_type) => patch.task_type = Some(task_type),
            FieldEdit::Assignee(assignee) => patch.assignee = Some(assignee),
            FieldEdit::TaskUrl(url) => patch.task_url = Some(url),
            FieldEdit::Dependencies(selected) => {
                let joined = selected
                    .iter()
                    .map(|value| value.trim())
                    .filter(|value| !value.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");
                patch.dependencies = Some(Dependencies::parse(&joined)?);
            }
            FieldEdit::Desc(desc) => patch.desc = Some(desc),
        }
        Ok(patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub task_id: TaskId,
    pub title: String,
    pub dates: String,
    pub link: Option<String>,
    pub disabled: bool,
    pub progress: u8,
    pub type_options: Vec<SelectOption>,
    pub assignee_options: Vec<SelectOption>,
    pub task_url: String,
    pub dependency_options: Vec<SelectOption>,
    pub desc: String,
}

impl Popup {
    pub fn build(state: &ViewState, task: &Task) -> Self {
        let type_options = state
            .task_types
            .iter()
            .map(|task_type| SelectOption {
                value: task_type.name.clone(),
                label: task_type.name.clone(),
                selected: task_type.name == task.task_type,
            })
            .collect();

        let assignee_options = state
            .developers
            .iter()
            .map(|developer| SelectOption {
                value: developer.clone(),
                label: developer.clone(),
                selected: *developer == task.assignee,
            })
            .collect();

        let dependency_options = state
            .tasks
            .iter()
            .filter(|other| other.id != task.id)
            .map(|other| SelectOption {
                value: other.id.to_string(),
                label: format!("#{} - {}", other.id, other.name),
                selected: task.dependencies.contains(other.id),
            })
            .collect();

        Self {
            task_id: task.id,
            title: format!("#{} - {}", task.id, task.name),
            dates: format!(
                "{} - {}",
                task.start.format("%b %-d, %Y"),
                task.end.format("%b %-d, %Y")
            ),
            link: (!task.task_url.is_empty()).then(|| task.task_url.clone()),
            disabled: !state.edit_mode,
            progress: task.progress,
            type_options,
            assignee_options,
            task_url: task.task_url.clone(),
            dependency_options,
            desc: task.desc.clone(),
        }
    }

    /// Markup for the widget's popup slot. Controls call the page's
    /// `updateGeneric`/`updateDependencies` handlers.
    pub fn to_html(&self) -> String {
        let id = self.task_id;
        let disabled = if self.disabled { " disabled" } else { "" };
        let mut html = String::from(r#"<div class="details-container">"#);

        if let Some(link) = &self.link {
            let _ = write!(
                html,
                r#"<a class="task-link" href="{}" target="_blank">Open</a>"#,
                escape_html(link)
            );
        }
        let _ = write!(
            html,
            r#"<h5>{}</h5><p class="task-dates">{}</p>"#,
            escape_html(&self.title),
            escape_html(&self.dates)
        );

        let _ = write!(
            html,
            r#"<label>Progress (%):</label><input{disabled} type="number" min="0" max="100" value="{}" onchange="updateGeneric({id}, 'progress', Number(this.value))">"#,
            self.progress
        );
        let _ = write!(
            html,
            r#"<label>Task Type:</label><select{disabled} onchange="updateGeneric({id}, 'task_type', this.value)">{}</select>"#,
            render_options(&self.type_options)
        );
        let _ = write!(
            html,
            r#"<label>Assignee:</label><select{disabled} onchange="updateGeneric({id}, 'assignee', this.value)">{}</select>"#,
            render_options(&self.assignee_options)
        );
        let _ = write!(
            html,
            r#"<label>Task URL:</label><input{disabled} type="text" value="{}" placeholder="https://..." onchange="updateGeneric({id}, 'task_url', this.value)">"#,
            escape_html(&self.task_url)
        );
        let _ = write!(
            html,
            r#"<label>Dependencies:</label><select{disabled} multiple onchange="updateDependencies({id}, this)"><option value="">(None)</option>{}</select>"#,
            render_options(&self.dependency_options)
        );
        let _ = write!(
            html,
            r#"<label>Description:</label><textarea{disabled} onchange="updateGeneric({id}, 'desc', this.value)">{}</textarea>"#,
            escape_html(&self.desc)
        );

        html.push_str("</div>");
        html
    }
}

fn render_options(options: &[SelectOption]) -> String {
    let mut html = String::new();
    for option in options {
        let _ = write!(
            html,
            r#"<option value="{}"{}>{}</option>"#,
            escape_html(&option.value),
            if option.selected { " selected" } else { "" },
            escape_html(&option.label)
        );
    }
    html
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
