use crate::errors::AppError;
use crate::graph::check_dependencies;
use crate::models::{NewTask, Task, TaskId, TaskPatch, DEFAULT_ASSIGNEE};
use crate::storage::{load_collection, save_collection};
use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Tasks keyed by id. Mutations are prepared against the current map and only
/// committed after the caller has persisted them.
///
/// Records from the data file that do not load as a task are kept verbatim
/// and written back unchanged; any id they carry stays reserved.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: BTreeMap<TaskId, Task>,
    unloaded: Vec<Value>,
    reserved: BTreeSet<TaskId>,
}

impl TaskStore {
    pub fn from_records(records: Vec<Value>) -> Self {
        let mut store = Self::default();
        for record in records {
            match serde_json::from_value::<Task>(record.clone()) {
                Ok(task) => store.insert_loaded(task, record),
                Err(err) => {
                    warn!("keeping unloadable task record as-is: {err}");
                    store.keep_unloaded(record);
                }
            }
        }
        store
    }

    fn insert_loaded(&mut self, task: Task, record: Value) {
        if self.id_taken(task.id) {
            warn!("keeping duplicate task id {} as-is", task.id);
            self.keep_unloaded(record);
            return;
        }
        self.tasks.insert(task.id, task);
    }

    fn keep_unloaded(&mut self, record: Value) {
        if let Some(id) = record
            .get("id")
            .and_then(|id| serde_json::from_value::<TaskId>(id.clone()).ok())
        {
            self.reserved.insert(id);
        }
        self.unloaded.push(record);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of records carried through verbatim.
    pub fn unloaded_len(&self) -> usize {
        self.unloaded.len()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn list(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    fn id_taken(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id) || self.reserved.contains(&id)
    }

    /// `max(ids) + 1`, or `None` once the id space is exhausted.
    pub fn next_id(&self) -> Option<TaskId> {
        let highest = self
            .tasks
            .keys()
            .chain(self.reserved.iter())
            .max()
            .copied();
        match highest {
            Some(id) => id.next(),
            None => Some(TaskId(1)),
        }
    }

    pub fn prepare_add(&self, new: NewTask, default_type: &str) -> Result<Task, AppError> {
        let missing = new.missing_fields();
        if !missing.is_empty() {
            return Err(AppError::bad_request(format!(
                "Missing mandatory fields: {}",
                missing.join(", ")
            )));
        }

        let id = match new.id {
            Some(id) => id,
            None => self
                .next_id()
                .ok_or_else(|| AppError::conflict("no task ids left after the highest id"))?,
        };
        if self.id_taken(id) {
            return Err(AppError::conflict(format!("task {id} already exists")));
        }

        let (Some(name), Some(start), Some(end)) = (new.name, new.start, new.end) else {
            return Err(AppError::bad_request("Missing mandatory fields"));
        };

        let task = Task {
            id,
            name,
            start,
            end,
            progress: new.progress.unwrap_or(0),
            assignee: non_blank(new.assignee).unwrap_or_else(|| DEFAULT_ASSIGNEE.to_string()),
            task_type: non_blank(new.task_type).unwrap_or_else(|| default_type.to_string()),
            dependencies: new.dependencies.unwrap_or_default(),
            desc: new.desc.unwrap_or_default(),
            task_url: new.task_url.unwrap_or_default(),
            extra: new.extra,
        };

        validate_fields(&task)?;
        check_dependencies(&self.tasks, &task).map_err(|err| AppError::bad_request(err.to_string()))?;
        Ok(task)
    }

    /// Merges `patch` over the stored record. Dependencies are only re-checked
    /// when the patch touches them, so legacy records stay editable.
    pub fn prepare_update(&self, patch: &TaskPatch) -> Result<Task, AppError> {
        let Some(existing) = self.tasks.get(&patch.id) else {
            return Err(AppError::not_found(format!("task {} not found", patch.id)));
        };

        let mut merged = existing.clone();
        merged.apply(patch);
        validate_fields(&merged)?;
        if patch.dependencies.is_some() {
            check_dependencies(&self.tasks, &merged)
                .map_err(|err| AppError::bad_request(err.to_string()))?;
        }
        Ok(merged)
    }

    /// The full collection as it would look with `task` committed, followed by
    /// the records that did not load.
    pub fn snapshot_with(&self, task: &Task) -> Result<Vec<Value>, AppError> {
        let mut snapshot = self.tasks.clone();
        snapshot.insert(task.id, task.clone());
        let mut records = snapshot
            .values()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(AppError::storage)?;
        records.extend(self.unloaded.iter().cloned());
        Ok(records)
    }

    pub fn commit(&mut self, task: Task) {
        self.tasks.insert(task.id, task);
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn validate_fields(task: &Task) -> Result<(), AppError> {
    if task.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    if task.end < task.start {
        return Err(AppError::bad_request(format!(
            "end ({}) is before start ({})",
            task.end, task.start
        )));
    }
    Ok(())
}

/// The task store shared by all request handlers. The lock is held across
/// validation, the file write and the commit, so writers never interleave.
#[derive(Clone)]
pub struct SharedStore {
    path: PathBuf,
    inner: Arc<Mutex<TaskStore>>,
}

impl SharedStore {
    pub async fn load(path: PathBuf) -> Self {
        let records: Vec<Value> = load_collection(&path).await;
        let store = TaskStore::from_records(records);
        info!("loaded {} tasks from {}", store.len(), path.display());
        if store.unloaded_len() > 0 {
            warn!("{} records in {} could not be loaded", store.unloaded_len(), path.display());
        }
        Self {
            path,
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub async fn list(&self) -> Vec<Task> {
        self.inner.lock().await.list()
    }

    pub async fn add(&self, new: NewTask, default_type: &str) -> Result<Task, AppError> {
        let mut store = self.inner.lock().await;
        let task = store.prepare_add(new, default_type)?;
        save_collection(&self.path, &store.snapshot_with(&task)?).await?;
        store.commit(task.clone());
        info!(id = %task.id, name = %task.name, "task added");
        Ok(task)
    }

    pub async fn update(&self, patch: &TaskPatch) -> Result<Task, AppError> {
        let mut store = self.inner.lock().await;
        let task = store.prepare_update(patch)?;
        save_collection(&self.path, &store.snapshot_with(&task)?).await?;
        store.commit(task.clone());
        info!(id = %task.id, "task updated");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_date, Dependencies, DEFAULT_TASK_TYPE};
    use axum::http::StatusCode;
    use serde_json::json;

    fn new_task(name: &str) -> NewTask {
        NewTask::new(
            name,
            parse_date("2024-01-01").unwrap(),
            parse_date("2024-01-05").unwrap(),
        )
    }

    fn store_with(names: &[&str]) -> TaskStore {
        let mut store = TaskStore::default();
        for name in names {
            let task = store.prepare_add(new_task(name), DEFAULT_TASK_TYPE).unwrap();
            store.commit(task);
        }
        store
    }

    fn temp_tasks_path(label: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("gantt_store_{label}_{}_{nanos}.json", std::process::id()));
        path
    }

    #[test]
    fn add_fills_defaults_on_empty_store() {
        let store = TaskStore::default();
        let task = store.prepare_add(new_task("Design"), DEFAULT_TASK_TYPE).unwrap();
        assert_eq!(
            serde_json::to_value(&task).unwrap(),
            json!({
                "id": 1,
                "name": "Design",
                "start": "2024-01-01",
                "end": "2024-01-05",
                "progress": 0,
                "assignee": "Unassigned",
                "task_type": "Frontend",
                "dependencies": "",
                "desc": "",
                "task_url": ""
            })
        );
    }

    #[test]
    fn add_assigns_max_plus_one_and_keeps_explicit_ids() {
        let mut store = TaskStore::default();
        let explicit = NewTask {
            id: Some(TaskId(10)),
            ..new_task("Explicit")
        };
        let task = store.prepare_add(explicit, DEFAULT_TASK_TYPE).unwrap();
        assert_eq!(task.id, TaskId(10));
        store.commit(task);

        let next = store.prepare_add(new_task("Next"), DEFAULT_TASK_TYPE).unwrap();
        assert_eq!(next.id, TaskId(11));
    }

    #[test]
    fn add_rejects_missing_fields_and_duplicates() {
        let store = store_with(&["One"]);
        let err = store
            .prepare_add(NewTask { name: None, ..new_task("x") }, DEFAULT_TASK_TYPE)
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("name"));

        let err = store
            .prepare_add(NewTask { id: Some(TaskId(1)), ..new_task("Dup") }, DEFAULT_TASK_TYPE)
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn add_uses_given_default_type_and_rejects_reversed_dates() {
        let store = TaskStore::default();
        let task = store.prepare_add(new_task("Typed"), "Research").unwrap();
        assert_eq!(task.task_type, "Research");

        let reversed = NewTask {
            start: Some(parse_date("2024-02-01").unwrap()),
            ..new_task("Backwards")
        };
        let err = store.prepare_add(reversed, DEFAULT_TASK_TYPE).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn update_merges_only_given_fields() {
        let store = store_with(&["One", "Two", "Three"]);
        let before = store.get(TaskId(3)).unwrap().clone();
        let merged = store.prepare_update(&TaskPatch::progress(TaskId(3), 50)).unwrap();
        assert_eq!(merged.progress, 50);
        assert_eq!(Task { progress: before.progress, ..merged }, before);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let store = store_with(&["One"]);
        let err = store.prepare_update(&TaskPatch::progress(TaskId(9), 5)).unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn update_rejects_dependency_cycles() {
        let mut store = store_with(&["One", "Two"]);
        let mut link = TaskPatch::new(TaskId(2));
        link.dependencies = Some(Dependencies::parse("1").unwrap());
        let task = store.prepare_update(&link).unwrap();
        store.commit(task);

        let mut back = TaskPatch::new(TaskId(1));
        back.dependencies = Some(Dependencies::parse("2").unwrap());
        let err = store.prepare_update(&back).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn assigned_ids_stop_at_the_top_of_the_range() {
        let mut store = TaskStore::default();
        let max = NewTask {
            id: Some(TaskId(u64::MAX)),
            ..new_task("Max")
        };
        let task = store.prepare_add(max, DEFAULT_TASK_TYPE).unwrap();
        store.commit(task);

        let err = store.prepare_add(new_task("After"), DEFAULT_TASK_TYPE).unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(TaskId(u64::MAX)).unwrap().name, "Max");
    }

    #[test]
    fn unloadable_records_keep_their_ids_reserved() {
        let store = TaskStore::from_records(vec![
            json!({"id": 1, "name": "A", "start": "2024-01-01", "end": "2024-01-02"}),
            json!({"id": 5, "name": "Bad", "start": "2024-01-01", "end": "2024-01-02", "progress": 150}),
            json!({"id": 1, "name": "Twin", "start": "2024-01-01", "end": "2024-01-02"}),
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.unloaded_len(), 2);
        assert_eq!(store.next_id(), Some(TaskId(6)));

        let err = store
            .prepare_add(NewTask { id: Some(TaskId(5)), ..new_task("Clash") }, DEFAULT_TASK_TYPE)
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unloadable_records_survive_the_next_save() {
        let path = temp_tasks_path("unloadable");
        let bad = json!({"id": 2, "name": "Bad", "start": "2024-01-01", "end": "2024-01-02", "progress": 150});
        let seed = json!([
            {"id": 1, "name": "A", "start": "2024-01-01", "end": "2024-01-02"},
            bad,
            {"id": 3, "name": "C", "start": "2024-01-03", "end": "2024-01-04"}
        ]);
        tokio::fs::write(&path, seed.to_string()).await.unwrap();

        let shared = SharedStore::load(path.clone()).await;
        assert_eq!(shared.list().await.len(), 2);
        let added = shared.add(new_task("D"), DEFAULT_TASK_TYPE).await.unwrap();
        assert_eq!(added.id, TaskId(4));

        let on_disk: Vec<serde_json::Value> =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        let names: Vec<_> = on_disk.iter().map(|record| record["name"].clone()).collect();
        assert_eq!(names, vec![json!("A"), json!("C"), json!("D"), json!("Bad")]);
        assert!(on_disk.contains(&bad));
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn failed_writes_leave_memory_unchanged() {
        let mut dir = temp_tasks_path("gone");
        dir.set_extension("");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let shared = SharedStore::load(dir.join("data.json")).await;
        shared.add(new_task("Kept"), DEFAULT_TASK_TYPE).await.unwrap();
        let before = shared.list().await;
        tokio::fs::remove_dir_all(&dir).await.unwrap();

        let err = shared.add(new_task("Lost"), DEFAULT_TASK_TYPE).await.unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Failed to save data");
        let err = shared.update(&TaskPatch::progress(TaskId(1), 80)).await.unwrap_err();
        assert_eq!(err.message, "Failed to save data");

        assert_eq!(shared.list().await, before);
        let next = shared.inner.lock().await.next_id();
        assert_eq!(next, Some(TaskId(2)));
    }

    #[tokio::test]
    async fn shared_store_persists_and_leaves_file_alone_on_errors() {
        let path = temp_tasks_path("shared");
        let shared = SharedStore::load(path.clone()).await;
        let task = shared.add(new_task("Design"), DEFAULT_TASK_TYPE).await.unwrap();
        assert_eq!(task.id, TaskId(1));

        let saved = tokio::fs::read(&path).await.unwrap();
        let err = shared.update(&TaskPatch::progress(TaskId(7), 10)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        let err = shared.add(NewTask::default(), DEFAULT_TASK_TYPE).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), saved);

        let reloaded = SharedStore::load(path.clone()).await;
        assert_eq!(reloaded.list().await, vec![task]);
        let _ = tokio::fs::remove_file(&path).await;
    }
}
