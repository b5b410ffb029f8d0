mod common;

use chrono::{TimeZone, Utc};
use common::{spawn_seeded, PASSWORD};
use gantt_board::client::ClientError;
use gantt_board::models::{parse_date, NewTask, TaskId};
use gantt_board::popup::FieldEdit;
use gantt_board::GanttClient;

const SEED: &str = r#"[
    {"id": 1, "name": "Design", "start": "2024-01-01", "end": "2024-01-05", "assignee": "Ana", "task_type": "Frontend"},
    {"id": 2, "name": "Build", "start": "2024-01-06", "end": "2024-01-12", "assignee": "Bo", "task_type": "Backend", "dependencies": "1"}
]"#;

async fn seeded() -> common::TestServer {
    spawn_seeded(&[("data.json", SEED), ("assignees.json", r#"["Ana", "Bo"]"#)]).await
}

#[tokio::test]
async fn client_loads_collections_read_only() {
    let server = seeded().await;
    let mut client = GanttClient::connect(&server.base_url).await.unwrap();

    assert_eq!(client.view.tasks.len(), 2);
    assert_eq!(client.view.developers, vec!["Ana".to_string(), "Bo".to_string()]);
    assert_eq!(client.view.task_types.len(), 2);
    assert!(!client.is_unlocked());

    let chart = client.chart();
    assert!(chart.readonly);
    assert_eq!(chart.tasks[1].dependencies, "task-1");

    let err = client
        .update_generic(TaskId(1), FieldEdit::Progress(30))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Locked));
    assert_eq!(client.view.task(TaskId(1)).unwrap().progress, 0);

    assert!(!client.login("wrong").await.unwrap());
    assert!(!client.is_unlocked());
}

#[tokio::test]
async fn client_edits_reach_the_server() {
    let server = seeded().await;
    let mut client = GanttClient::connect(&server.base_url).await.unwrap();
    assert!(client.login(PASSWORD).await.unwrap());

    client
        .update_generic(TaskId(1), FieldEdit::Assignee("Bo".into()))
        .await
        .unwrap();
    let start = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 2, 3, 9, 0, 0).unwrap();
    client.drag_dates(TaskId(2), start, end).await.unwrap();
    client.drag_progress(TaskId(2), 40.4).await.unwrap();

    let added = client
        .add_task(NewTask::new(
            "Ship",
            parse_date("2024-02-04").unwrap(),
            parse_date("2024-02-05").unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(added.id, TaskId(3));
    client
        .update_generic(TaskId(3), FieldEdit::Dependencies(vec!["".into(), "2".into()]))
        .await
        .unwrap();

    let fresh = GanttClient::connect(&server.base_url).await.unwrap();
    let design = fresh.view.task(TaskId(1)).unwrap();
    assert_eq!(design.assignee, "Bo");
    let build = fresh.view.task(TaskId(2)).unwrap();
    assert_eq!(build.start, parse_date("2024-02-01").unwrap());
    assert_eq!(build.end, parse_date("2024-02-03").unwrap());
    assert_eq!(build.progress, 40);
    assert_eq!(fresh.view.task(TaskId(3)).unwrap().dependencies.to_string(), "2");
}

#[tokio::test]
async fn client_keeps_optimistic_edit_when_server_rejects() {
    let server = seeded().await;
    let mut client = GanttClient::connect(&server.base_url).await.unwrap();
    assert!(client.login(PASSWORD).await.unwrap());

    client
        .update_generic(TaskId(1), FieldEdit::Dependencies(vec!["2".into()]))
        .await
        .unwrap();
    assert_eq!(client.view.task(TaskId(1)).unwrap().dependencies.to_string(), "2");

    client.reload().await.unwrap();
    assert!(client.view.task(TaskId(1)).unwrap().dependencies.is_empty());
    assert!(client.is_unlocked());
}

#[tokio::test]
async fn client_checks_mandatory_fields_and_logout_locks() {
    let server = seeded().await;
    let mut client = GanttClient::connect(&server.base_url).await.unwrap();
    assert!(client.login(PASSWORD).await.unwrap());

    let err = client.add_task(NewTask::default()).await.unwrap_err();
    match err {
        ClientError::MissingFields(fields) => assert_eq!(fields, vec!["name", "start", "end"]),
        other => panic!("unexpected error: {other}"),
    }

    client.logout().await.unwrap();
    assert!(!client.is_unlocked());
    let err = client.drag_progress(TaskId(1), 10.0).await.unwrap_err();
    assert!(matches!(err, ClientError::Locked));
}
