//! Subtask repository — operations scoped to a parent todo.

use std::sync::Arc;

use tracing::{debug, info};

use super::model::{NewSubtask, Subtask, SubtaskUpdate};
use crate::error::{Result, TodoError};
use crate::store::Database;
use crate::todos::model::PositionUpdate;

#[derive(Clone)]
pub struct SubtaskRepository {
    db: Arc<dyn Database>,
}

impl SubtaskRepository {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Subtasks of `todo_id` ordered by `(position ASC, created_at ASC)`.
    /// An unknown parent simply yields an empty list.
    pub async fn list_by_parent(&self, todo_id: i64) -> Result<Vec<Subtask>> {
        Ok(self.db.list_subtasks(todo_id).await?)
    }

    /// Create a subtask under an existing todo.
    ///
    /// The parent is checked first so callers get `NotFound` rather than a
    /// foreign-key failure from storage.
    pub async fn create(&self, subtask: NewSubtask) -> Result<Subtask> {
        self.ensure_parent(subtask.todo_id).await?;
        // The parent can still vanish between the check and the insert.
        let created = match self.db.insert_subtask(&subtask).await.map_err(TodoError::from) {
            Err(TodoError::ReferentialIntegrity(_)) => {
                return Err(TodoError::todo_not_found(subtask.todo_id));
            }
            other => other?,
        };
        info!(id = created.id, todo_id = created.todo_id, "Subtask created");
        Ok(created)
    }

    /// Apply only the populated fields; an empty update just reads the row.
    pub async fn update(&self, id: i64, update: SubtaskUpdate) -> Result<Subtask> {
        if update.is_empty() {
            return self
                .db
                .get_subtask(id)
                .await?
                .ok_or_else(|| TodoError::subtask_not_found(id));
        }
        let updated = self
            .db
            .update_subtask(id, &update)
            .await?
            .ok_or_else(|| TodoError::subtask_not_found(id))?;
        debug!(id, "Subtask updated");
        Ok(updated)
    }

    pub async fn toggle(&self, id: i64) -> Result<Subtask> {
        let toggled = self
            .db
            .toggle_subtask(id)
            .await?
            .ok_or_else(|| TodoError::subtask_not_found(id))?;
        debug!(id, completed = toggled.completed, "Subtask toggled");
        Ok(toggled)
    }

    pub async fn delete(&self, id: i64) -> Result<Subtask> {
        let deleted = self
            .db
            .delete_subtask(id)
            .await?
            .ok_or_else(|| TodoError::subtask_not_found(id))?;
        info!(id, todo_id = deleted.todo_id, "Subtask deleted");
        Ok(deleted)
    }

    /// Reorder subtasks of one todo atomically. Ids that do not belong to
    /// `todo_id` fail the whole batch.
    pub async fn reorder(&self, todo_id: i64, positions: &[PositionUpdate]) -> Result<()> {
        if positions.is_empty() {
            return Err(TodoError::Validation(
                "positions must be a non-empty array".to_string(),
            ));
        }
        self.ensure_parent(todo_id).await?;
        self.db.reorder_subtasks(todo_id, positions).await?;
        info!(todo_id, count = positions.len(), "Subtask positions updated");
        Ok(())
    }

    async fn ensure_parent(&self, todo_id: i64) -> Result<()> {
        if self.db.todo_exists(todo_id).await? {
            Ok(())
        } else {
            Err(TodoError::todo_not_found(todo_id))
        }
    }
}
