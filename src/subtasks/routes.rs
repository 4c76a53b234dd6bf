//! REST endpoints for `/api/subtasks`.

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post, put};

use super::model::Subtask;
use crate::api::requests::{self, CreateSubtaskRequest, ReorderRequest, UpdateSubtaskRequest};
use crate::api::{ApiError, ApiResponse, AppState, json_body};

type SubtaskResult<T> = Result<ApiResponse<T>, ApiError>;

pub fn subtask_routes() -> Router<AppState> {
    Router::new()
        .route("/api/subtasks", post(create_subtask))
        .route("/api/subtasks/todo/{todo_id}", get(list_subtasks))
        .route("/api/subtasks/todo/{todo_id}/reorder", patch(reorder_subtasks))
        .route("/api/subtasks/{id}", put(update_subtask).delete(delete_subtask))
        .route("/api/subtasks/{id}/toggle", patch(toggle_subtask))
}

fn subtask_id(raw: &str) -> Result<i64, ApiError> {
    requests::id_param(raw, "subtask").map_err(ApiError::validation)
}

fn parent_id(raw: &str) -> Result<i64, ApiError> {
    requests::id_param(raw, "todo").map_err(ApiError::validation)
}

async fn list_subtasks(
    State(state): State<AppState>,
    Path(todo_id): Path<String>,
) -> SubtaskResult<Vec<Subtask>> {
    let todo_id = parent_id(&todo_id)?;
    let subtasks = state
        .subtasks
        .list_by_parent(todo_id)
        .await
        .map_err(|e| state.reject(e))?;
    let count = subtasks.len();
    Ok(ApiResponse::ok(subtasks).with_count(count))
}

async fn create_subtask(
    State(state): State<AppState>,
    body: Result<Json<CreateSubtaskRequest>, JsonRejection>,
) -> SubtaskResult<Subtask> {
    let input = json_body(body)?.validate().map_err(ApiError::validation)?;
    let subtask = state
        .subtasks
        .create(input)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiResponse::created(subtask).with_message("Subtask created successfully"))
}

async fn update_subtask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateSubtaskRequest>, JsonRejection>,
) -> SubtaskResult<Subtask> {
    let id = subtask_id(&id)?;
    let update = json_body(body)?.validate().map_err(ApiError::validation)?;
    let subtask = state
        .subtasks
        .update(id, update)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ok(subtask).with_message("Subtask updated successfully"))
}

async fn toggle_subtask(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> SubtaskResult<Subtask> {
    let id = subtask_id(&id)?;
    let subtask = state.subtasks.toggle(id).await.map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ok(subtask).with_message("Subtask toggled successfully"))
}

async fn delete_subtask(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> SubtaskResult<Subtask> {
    let id = subtask_id(&id)?;
    let subtask = state.subtasks.delete(id).await.map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ok(subtask).with_message("Subtask deleted successfully"))
}

async fn reorder_subtasks(
    State(state): State<AppState>,
    Path(todo_id): Path<String>,
    body: Result<Json<ReorderRequest>, JsonRejection>,
) -> SubtaskResult<()> {
    let todo_id = parent_id(&todo_id)?;
    let positions = json_body(body)?.validate().map_err(ApiError::validation)?;
    state
        .subtasks
        .reorder(todo_id, &positions)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ack("Subtask positions updated successfully"))
}
