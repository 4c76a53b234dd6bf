//! Integration tests for the todo + subtask REST surface.
//!
//! Each test spins up the Axum app on a random port backed by a fresh
//! database file, then drives it over HTTP with reqwest.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use hufflepuff_todo::api::{self, AppState};
use hufflepuff_todo::store::{Database, LibSqlBackend};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

struct TestServer {
    base: String,
    client: reqwest::Client,
    _dir: tempfile::TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        read(self.client.get(self.url(path)).send().await.unwrap()).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        read(self.client.post(self.url(path)).json(&body).send().await.unwrap()).await
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        read(self.client.put(self.url(path)).json(&body).send().await.unwrap()).await
    }

    async fn patch(&self, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = self.client.patch(self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        read(request.send().await.unwrap()).await
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        read(self.client.delete(self.url(path)).send().await.unwrap()).await
    }

    async fn create_todo(&self, title: &str, position: u32) -> i64 {
        let (status, body) = self
            .post(
                "/api/todos",
                json!({"title": title, "date": "2025-12-03", "position": position}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["data"]["id"].as_i64().unwrap()
    }
}

async fn read(response: reqwest::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.json::<Value>().await.unwrap();
    (status, body)
}

/// Start the app on a random port with a fresh database.
async fn start_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let backend = LibSqlBackend::new_local(&dir.path().join("todos.db"))
        .await
        .unwrap();
    let db: Arc<dyn Database> = Arc::new(backend);
    let app = api::app(AppState::new(db, false), None);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        client: reqwest::Client::new(),
        _dir: dir,
    }
}

fn ids(list: &Value) -> Vec<i64> {
    list["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn todo_with_subtask_round_trip() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let todo_id = server.create_todo("Study Herbology", 0).await;

        let (status, body) = server
            .post(
                "/api/subtasks",
                json!({"todoId": todo_id, "title": "Read Chapter 5", "position": 0}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Subtask created successfully");

        let (status, body) = server.get(&format!("/api/todos/{todo_id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let subtasks = body["data"]["subtasks"].as_array().unwrap();
        assert_eq!(subtasks.len(), 1);
        assert_eq!(subtasks[0]["title"], "Read Chapter 5");
        assert_eq!(subtasks[0]["completed"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn reorder_swaps_list_order() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let first = server.create_todo("Potions essay", 0).await;
        let second = server.create_todo("Feed the bowtruckles", 0).await;
        assert_eq!((first, second), (1, 2));

        let (status, body) = server
            .patch(
                "/api/todos/reorder/positions",
                Some(json!({"positions": [{"id": 1, "position": 2}, {"id": 2, "position": 1}]})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Positions updated successfully");

        let (_, list) = server.get("/api/todos").await;
        assert_eq!(ids(&list), vec![2, 1]);
        assert_eq!(list["count"], 2);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn failed_reorder_leaves_positions_untouched() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let mut created = Vec::new();
        for (i, title) in ["a", "b", "c", "d"].iter().enumerate() {
            created.push(server.create_todo(title, i as u32).await);
        }

        let (status, body) = server
            .patch(
                "/api/todos/reorder/positions",
                Some(json!({"positions": [
                    {"id": created[0], "position": 9},
                    {"id": 999, "position": 0},
                    {"id": created[3], "position": 0},
                ]})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (_, list) = server.get("/api/todos").await;
        assert_eq!(ids(&list), created);
        let positions: Vec<i64> = list["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["position"].as_i64().unwrap())
            .collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn delete_missing_todo_is_not_found() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let (status, body) = server.delete("/api/todos/42").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Todo not found");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn subtask_under_missing_todo_is_not_found() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let (status, body) = server
            .post("/api/subtasks", json!({"todoId": 77, "title": "Orphan"}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Todo not found");

        let (_, list) = server.get("/api/subtasks/todo/77").await;
        assert_eq!(list["count"], 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn deleting_todo_cascades_to_subtasks() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let todo_id = server.create_todo("Quidditch practice", 0).await;
        for title in ["Polish broom", "Find gloves"] {
            let (status, _) = server
                .post("/api/subtasks", json!({"todoId": todo_id, "title": title}))
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = server.delete(&format!("/api/todos/{todo_id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["subtasks"].as_array().unwrap().len(), 2);

        let (status, list) = server.get(&format!("/api/subtasks/todo/{todo_id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(list["data"].as_array().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn toggle_twice_restores_completion() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let todo_id = server.create_todo("Water the mandrakes", 0).await;
        let path = format!("/api/todos/{todo_id}/toggle");

        let (_, body) = server.patch(&path, None).await;
        assert_eq!(body["data"]["completed"], true);
        let (_, body) = server.patch(&path, None).await;
        assert_eq!(body["data"]["completed"], false);
        assert_eq!(body["message"], "Todo toggled successfully");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn partial_update_keeps_absent_fields() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let todo_id = server.create_todo("Transfiguration notes", 3).await;

        let (status, body) = server
            .put(&format!("/api/todos/{todo_id}"), json!({"completed": true}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Transfiguration notes");
        assert_eq!(body["data"]["position"], 3);
        assert_eq!(body["data"]["completed"], true);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn list_by_date_filters_and_rejects_bad_dates() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.create_todo("On the day", 0).await;
        let (status, _) = server
            .post("/api/todos", json!({"title": "Later", "date": "2025-12-04"}))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, list) = server.get("/api/todos/date/2025-12-03").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["count"], 1);
        assert_eq!(list["data"][0]["title"], "On the day");

        let (status, body) = server.get("/api/todos/date/not-a-date").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn invalid_body_reports_field_errors() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let (status, body) = server.post("/api/todos", json!({"title": "   "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"title"));
        assert!(fields.contains(&"date"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn subtask_reorder_is_scoped_to_parent() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let parent = server.create_todo("Parent", 0).await;
        let other = server.create_todo("Other", 0).await;

        let (_, a) = server
            .post("/api/subtasks", json!({"todoId": parent, "title": "A"}))
            .await;
        let (_, b) = server
            .post("/api/subtasks", json!({"todoId": parent, "title": "B"}))
            .await;
        let (_, foreign) = server
            .post("/api/subtasks", json!({"todoId": other, "title": "X"}))
            .await;
        let a = a["data"]["id"].as_i64().unwrap();
        let b = b["data"]["id"].as_i64().unwrap();
        let foreign = foreign["data"]["id"].as_i64().unwrap();

        let path = format!("/api/subtasks/todo/{parent}/reorder");
        let (status, _) = server
            .patch(
                &path,
                Some(json!({"positions": [{"id": a, "position": 1}, {"id": foreign, "position": 0}]})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = server
            .patch(
                &path,
                Some(json!({"positions": [{"id": a, "position": 1}, {"id": b, "position": 0}]})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, list) = server.get(&format!("/api/subtasks/todo/{parent}")).await;
        assert_eq!(ids(&list), vec![b, a]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_route_and_health() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let (status, body) = server.get("/api/wands").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Route /api/wands not found");

        let (status, body) = server.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn subtask_update_toggle_and_delete_over_http() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let todo_id = server.create_todo("Care of Magical Creatures", 0).await;
        let (_, created) = server
            .post("/api/subtasks", json!({"todoId": todo_id, "title": "Feed flobberworms"}))
            .await;
        let id = created["data"]["id"].as_i64().unwrap();

        let (status, body) = server
            .put(&format!("/api/subtasks/{id}"), json!({"title": " Feed lettuce ", "position": "2"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Feed lettuce");
        assert_eq!(body["data"]["position"], 2);
        assert_eq!(body["data"]["completed"], false);

        let (status, body) = server.patch(&format!("/api/subtasks/{id}/toggle"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["completed"], true);
        assert_eq!(body["message"], "Subtask toggled successfully");

        let (_, parent) = server.get(&format!("/api/todos/{todo_id}")).await;
        assert_eq!(parent["data"]["completed"], false);

        let (status, body) = server.delete(&format!("/api/subtasks/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id);

        let (status, body) = server.delete(&format!("/api/subtasks/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Subtask not found");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn missing_ids_are_not_found_over_http() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let (status, body) = server.patch("/api/todos/5/toggle", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Todo not found");

        let (status, body) = server.put("/api/todos/5", json!({"title": "Ghost"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) = server.get("/api/todos/5").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = server.put("/api/subtasks/5", json!({"completed": true})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Subtask not found");

        let (status, _) = server.patch("/api/subtasks/5/toggle", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn wrongly_typed_body_is_bad_request() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let todo_id = server.create_todo("Divination homework", 0).await;

        let (status, body) = server
            .put(&format!("/api/todos/{todo_id}"), json!({"completed": "yes"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (_, unchanged) = server.get(&format!("/api/todos/{todo_id}")).await;
        assert_eq!(unchanged["data"]["completed"], false);
    })
    .await
    .expect("test timed out");
}
