//! Todo repository — lifecycle operations and the batch reorder.
//!
//! Translates gateway results into the domain's closed error set: a missing
//! row becomes `NotFound`, storage integrity signals become
//! `ReferentialIntegrity`/`Conflict`, anything else `TransientStorage`.

use std::sync::Arc;

use tracing::{debug, info};

use super::model::{NewTodo, PositionUpdate, Todo, TodoUpdate, parse_todo_date};
use crate::error::{Result, TodoError};
use crate::store::Database;

/// Stateless operations over todos. Cheap to clone; all state lives in the store.
#[derive(Clone)]
pub struct TodoRepository {
    db: Arc<dyn Database>,
}

impl TodoRepository {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Every todo ordered by `(position ASC, created_at DESC)` with its subtasks.
    pub async fn list_all(&self) -> Result<Vec<Todo>> {
        Ok(self.db.list_todos(None).await?)
    }

    /// Todos whose date equals `raw` exactly.
    pub async fn list_by_date(&self, raw: &str) -> Result<Vec<Todo>> {
        let date = parse_todo_date(raw)
            .ok_or_else(|| TodoError::InvalidArgument("Invalid date format".to_string()))?;
        Ok(self.db.list_todos(Some(date)).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Todo> {
        self.db
            .get_todo(id)
            .await?
            .ok_or_else(|| TodoError::todo_not_found(id))
    }

    pub async fn create(&self, todo: NewTodo) -> Result<Todo> {
        let created = self.db.insert_todo(&todo).await?;
        info!(id = created.id, title = %created.title, "Todo created");
        Ok(created)
    }

    /// Apply only the populated fields of `update`.
    pub async fn update(&self, id: i64, update: TodoUpdate) -> Result<Todo> {
        if update.is_empty() {
            return self.get(id).await;
        }
        let updated = self
            .db
            .update_todo(id, &update)
            .await?
            .ok_or_else(|| TodoError::todo_not_found(id))?;
        debug!(id, "Todo updated");
        Ok(updated)
    }

    /// Flip `completed`. Subtasks are left untouched.
    pub async fn toggle(&self, id: i64) -> Result<Todo> {
        let toggled = self
            .db
            .toggle_todo(id)
            .await?
            .ok_or_else(|| TodoError::todo_not_found(id))?;
        debug!(id, completed = toggled.completed, "Todo toggled");
        Ok(toggled)
    }

    /// Delete a todo together with its subtasks.
    pub async fn delete(&self, id: i64) -> Result<Todo> {
        let deleted = self
            .db
            .delete_todo(id)
            .await?
            .ok_or_else(|| TodoError::todo_not_found(id))?;
        info!(id, subtasks = deleted.subtasks.len(), "Todo deleted");
        Ok(deleted)
    }

    /// Apply a batch of `(id, position)` pairs atomically.
    ///
    /// Positions need not be unique, contiguous, or cover every todo; todos
    /// outside the batch keep their position. A single unknown id fails the
    /// whole batch with `NotFound` and leaves every position unchanged.
    pub async fn reorder(&self, positions: &[PositionUpdate]) -> Result<()> {
        if positions.is_empty() {
            return Err(TodoError::Validation(
                "positions must be a non-empty array".to_string(),
            ));
        }
        self.db.reorder_todos(positions).await?;
        info!(count = positions.len(), "Todo positions updated");
        Ok(())
    }
}
