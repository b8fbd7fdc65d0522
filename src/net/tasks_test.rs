use super::*;
use crate::test_helpers::{ScriptedIssuer, ScriptedTransport, api_client, json_response};
use reqwest::Method;
use serde_json::json;

fn task_json(id: i64, title: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "status": status,
        "deadline": null,
        "assignee": 1,
        "assignee_username": "admin",
        "created_at": "2025-02-01T09:30:00Z",
        "updated_at": "2025-02-01T09:30:00Z"
    })
}

#[test]
fn list_params_build_query_in_order() {
    let params = TaskListParams {
        status: Some(TaskStatus::InProgress),
        assignee: Some(4),
        search: Some("docs".into()),
        ordering: Some("-deadline".into()),
    };
    assert_eq!(
        params.to_query(),
        vec![
            ("status", "In Progress".to_owned()),
            ("assignee", "4".to_owned()),
            ("search", "docs".to_owned()),
            ("ordering", "-deadline".to_owned()),
        ]
    );
}

#[test]
fn list_params_skip_empty_strings() {
    let params = TaskListParams { search: Some(String::new()), ..TaskListParams::default() };
    assert!(params.to_query().is_empty());
}

#[tokio::test]
async fn list_filters_by_status() {
    let transport = ScriptedTransport::new(vec![json_response(200, &json!([task_json(2, "QA tasks", "Done")]))]);
    let (client, _jar) = api_client(transport.clone(), ScriptedIssuer::new(&[]));
    let tasks = TasksApi::new(Arc::new(client));

    let params = TaskListParams { status: Some(TaskStatus::Done), ..TaskListParams::default() };
    let results = tasks.list(&params).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "QA tasks");
    let sent = transport.requests();
    assert_eq!(sent[0].url.path(), "/api/tasks/");
    assert_eq!(sent[0].url.query(), Some("status=Done"));
}

#[tokio::test]
async fn create_posts_payload_with_csrf_token() {
    let transport = ScriptedTransport::new(vec![json_response(201, &task_json(99, "New Task", "Todo"))]);
    let (client, _jar) = api_client(transport.clone(), ScriptedIssuer::new(&[Some("tok")]));
    let tasks = TasksApi::new(Arc::new(client));

    let mut payload = TaskCreate::new("New Task");
    payload.description = Some("Write tests".into());
    let created = tasks.create(&payload).await.unwrap();

    assert_eq!(created.id, 99);
    assert_eq!(created.title, "New Task");
    let sent = &transport.requests()[0];
    assert_eq!(sent.method, Method::POST);
    assert_eq!(sent.csrf_token.as_deref(), Some("tok"));
    assert_eq!(sent.body, Some(json!({ "title": "New Task", "description": "Write tests" })));
}

#[tokio::test]
async fn update_and_delete_target_task_path() {
    let transport = ScriptedTransport::new(vec![
        json_response(200, &task_json(5, "Edited", "Done")),
        Ok(crate::net::transport::RawResponse { status: 204, body: String::new() }),
    ]);
    let (client, _jar) = api_client(transport.clone(), ScriptedIssuer::new(&[Some("tok")]));
    let tasks = TasksApi::new(Arc::new(client));

    let patch = TaskPatch { status: Some(TaskStatus::Done), ..TaskPatch::default() };
    let updated = tasks.update(5, &patch).await.unwrap();
    tasks.delete(5).await.unwrap();

    assert_eq!(updated.status, TaskStatus::Done);
    let sent = transport.requests();
    assert_eq!(sent[0].method, Method::PATCH);
    assert_eq!(sent[1].method, Method::DELETE);
    assert_eq!(transport.paths(), vec!["/api/tasks/5/", "/api/tasks/5/"]);
}

#[tokio::test]
async fn create_validation_errors_surface_verbatim() {
    let transport = ScriptedTransport::new(vec![json_response(
        400,
        &json!({ "assignee": ["Cannot assign task to inactive user."] }),
    )]);
    let (client, _jar) = api_client(transport, ScriptedIssuer::new(&[Some("tok")]));
    let tasks = TasksApi::new(Arc::new(client));

    let err = tasks.create(&TaskCreate::new("x")).await.unwrap_err();
    match err {
        ApiError::Validation(fields) => {
            assert_eq!(fields.field("assignee"), vec!["Cannot assign task to inactive user."]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}
