//! REST endpoints for `/api/todos`.

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, patch};

use super::model::Todo;
use crate::api::requests::{self, CreateTodoRequest, ReorderRequest, UpdateTodoRequest};
use crate::api::{ApiError, ApiResponse, AppState, json_body};

type TodoResult<T> = Result<ApiResponse<T>, ApiError>;

/// Build the todo routes. Static segments (`date`, `reorder`) win over `{id}`.
pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/date/{date}", get(list_todos_by_date))
        .route("/api/todos/reorder/positions", patch(reorder_todos))
        .route(
            "/api/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route("/api/todos/{id}/toggle", patch(toggle_todo))
}

fn todo_id(raw: &str) -> Result<i64, ApiError> {
    requests::id_param(raw, "todo").map_err(ApiError::validation)
}

async fn list_todos(State(state): State<AppState>) -> TodoResult<Vec<Todo>> {
    let todos = state.todos.list_all().await.map_err(|e| state.reject(e))?;
    let count = todos.len();
    Ok(ApiResponse::ok(todos).with_count(count))
}

async fn list_todos_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> TodoResult<Vec<Todo>> {
    let todos = state
        .todos
        .list_by_date(&date)
        .await
        .map_err(|e| state.reject(e))?;
    let count = todos.len();
    Ok(ApiResponse::ok(todos).with_count(count))
}

async fn get_todo(State(state): State<AppState>, Path(id): Path<String>) -> TodoResult<Todo> {
    let id = todo_id(&id)?;
    let todo = state.todos.get(id).await.map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ok(todo))
}

async fn create_todo(
    State(state): State<AppState>,
    body: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> TodoResult<Todo> {
    let input = json_body(body)?.validate().map_err(ApiError::validation)?;
    let todo = state.todos.create(input).await.map_err(|e| state.reject(e))?;
    Ok(ApiResponse::created(todo).with_message("Todo created successfully"))
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> TodoResult<Todo> {
    let id = todo_id(&id)?;
    let update = json_body(body)?.validate().map_err(ApiError::validation)?;
    let todo = state
        .todos
        .update(id, update)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ok(todo).with_message("Todo updated successfully"))
}

async fn toggle_todo(State(state): State<AppState>, Path(id): Path<String>) -> TodoResult<Todo> {
    let id = todo_id(&id)?;
    let todo = state.todos.toggle(id).await.map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ok(todo).with_message("Todo toggled successfully"))
}

async fn delete_todo(State(state): State<AppState>, Path(id): Path<String>) -> TodoResult<Todo> {
    let id = todo_id(&id)?;
    let todo = state.todos.delete(id).await.map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ok(todo).with_message("Todo deleted successfully"))
}

async fn reorder_todos(
    State(state): State<AppState>,
    body: Result<Json<ReorderRequest>, JsonRejection>,
) -> TodoResult<()> {
    let positions = json_body(body)?.validate().map_err(ApiError::validation)?;
    state
        .todos
        .reorder(&positions)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ack("Positions updated successfully"))
}
