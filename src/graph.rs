//! Dependency checks run before a task is written.

use crate::models::{Task, TaskId};
use std::collections::{BTreeMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    SelfReference(TaskId),
    UnknownTask(TaskId),
    Cycle { task: TaskId, via: TaskId },
}

impl std::fmt::Display for DependencyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfReference(id) => write!(f, "task {id} cannot depend on itself"),
            Self::UnknownTask(id) => write!(f, "dependency {id} does not exist"),
            Self::Cycle { task, via } => {
                write!(f, "dependency on task {via} would make task {task} depend on itself")
            }
        }
    }
}

impl std::error::Error for DependencyError {}

/// Validates `candidate.dependencies` against `tasks`, treating `candidate` as
/// the stored version of its id.
pub fn check_dependencies(
    tasks: &BTreeMap<TaskId, Task>,
    candidate: &Task,
) -> Result<(), DependencyError> {
    for dep in candidate.dependencies.iter() {
        if dep == candidate.id {
            return Err(DependencyError::SelfReference(dep));
        }
        if !tasks.contains_key(&dep) {
            return Err(DependencyError::UnknownTask(dep));
        }
    }

    for dep in candidate.dependencies.iter() {
        if reaches(tasks, dep, candidate.id) {
            return Err(DependencyError::Cycle {
                task: candidate.id,
                via: dep,
            });
        }
    }

    Ok(())
}

/// Breadth-first walk along stored dependency edges.
fn reaches(tasks: &BTreeMap<TaskId, Task>, from: TaskId, target: TaskId) -> bool {
    let mut visited: HashSet<TaskId> = HashSet::new();
    let mut queue: VecDeque<TaskId> = VecDeque::new();
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(task) = tasks.get(&current) {
            queue.extend(task.dependencies.iter().filter(|dep| !visited.contains(dep)));
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_date, Dependencies};
    use serde_json::Map;

    fn task(id: u64, deps: &str) -> Task {
        Task {
            id: TaskId(id),
            name: format!("task {id}"),
            start: parse_date("2024-03-01").unwrap(),
            end: parse_date("2024-03-02").unwrap(),
            progress: 0,
            assignee: "Unassigned".into(),
            task_type: "Frontend".into(),
            dependencies: Dependencies::parse(deps).unwrap(),
            desc: String::new(),
            task_url: String::new(),
            extra: Map::new(),
        }
    }

    fn board(tasks: Vec<Task>) -> BTreeMap<TaskId, Task> {
        tasks.into_iter().map(|task| (task.id, task)).collect()
    }

    #[test]
    fn accepts_chain() {
        let tasks = board(vec![task(1, ""), task(2, "1")]);
        assert_eq!(check_dependencies(&tasks, &task(3, "1, 2")), Ok(()));
    }

    #[test]
    fn rejects_self_and_unknown() {
        let tasks = board(vec![task(1, "")]);
        assert_eq!(
            check_dependencies(&tasks, &task(1, "1")),
            Err(DependencyError::SelfReference(TaskId(1)))
        );
        assert_eq!(
            check_dependencies(&tasks, &task(2, "9")),
            Err(DependencyError::UnknownTask(TaskId(9)))
        );
    }

    #[test]
    fn rejects_indirect_cycle() {
        let tasks = board(vec![task(1, ""), task(2, "1"), task(3, "2")]);
        let err = check_dependencies(&tasks, &task(1, "3")).unwrap_err();
        assert_eq!(err, DependencyError::Cycle { task: TaskId(1), via: TaskId(3) });
    }

    #[test]
    fn tolerates_existing_cycles_elsewhere() {
        let tasks = board(vec![task(1, "2"), task(2, "1"), task(3, "")]);
        assert_eq!(check_dependencies(&tasks, &task(4, "1, 3")), Ok(()));
    }
}
