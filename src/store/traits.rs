//! Unified `Database` trait — the storage gateway for todos and subtasks.
//!
//! Single-record reads return `Option` so callers decide what "missing"
//! means; batch operations report the first missing id as
//! `DatabaseError::NotFound` after rolling the whole batch back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::seed::SeedTodo;
use crate::subtasks::model::{NewSubtask, Subtask, SubtaskUpdate};
use crate::todos::model::{NewTodo, PositionUpdate, Todo, TodoUpdate};

/// Backend-agnostic, transactional storage for todos and their subtasks.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Round-trip a trivial query to verify connectivity.
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Flush and release storage resources during shutdown.
    async fn close(&self) -> Result<(), DatabaseError>;

    // ── Todos ───────────────────────────────────────────────────────

    /// List todos ordered by `(position ASC, created_at DESC)`, each with
    /// its subtasks. `date` restricts to an exact date match.
    async fn list_todos(&self, date: Option<DateTime<Utc>>) -> Result<Vec<Todo>, DatabaseError>;

    /// Get a todo with its subtasks.
    async fn get_todo(&self, id: i64) -> Result<Option<Todo>, DatabaseError>;

    /// Cheap existence check used as a pre-condition by child operations.
    async fn todo_exists(&self, id: i64) -> Result<bool, DatabaseError>;

    /// Insert a new todo and return the stored record.
    async fn insert_todo(&self, todo: &NewTodo) -> Result<Todo, DatabaseError>;

    /// Apply a partial update. Returns `None` if the todo does not exist.
    async fn update_todo(
        &self,
        id: i64,
        update: &TodoUpdate,
    ) -> Result<Option<Todo>, DatabaseError>;

    /// Flip `completed` in a single statement. Returns `None` if absent.
    async fn toggle_todo(&self, id: i64) -> Result<Option<Todo>, DatabaseError>;

    /// Delete a todo and, by cascade, its subtasks. Returns the removed record.
    async fn delete_todo(&self, id: i64) -> Result<Option<Todo>, DatabaseError>;

    /// Apply every position update in one transaction, or none of them.
    async fn reorder_todos(&self, positions: &[PositionUpdate]) -> Result<(), DatabaseError>;

    // ── Subtasks ────────────────────────────────────────────────────

    /// List subtasks of a todo ordered by `(position ASC, created_at ASC)`.
    async fn list_subtasks(&self, todo_id: i64) -> Result<Vec<Subtask>, DatabaseError>;

    async fn get_subtask(&self, id: i64) -> Result<Option<Subtask>, DatabaseError>;

    /// Insert a new subtask. A missing parent surfaces as `ForeignKey`.
    async fn insert_subtask(&self, subtask: &NewSubtask) -> Result<Subtask, DatabaseError>;

    async fn update_subtask(
        &self,
        id: i64,
        update: &SubtaskUpdate,
    ) -> Result<Option<Subtask>, DatabaseError>;

    async fn toggle_subtask(&self, id: i64) -> Result<Option<Subtask>, DatabaseError>;

    async fn delete_subtask(&self, id: i64) -> Result<Option<Subtask>, DatabaseError>;

    /// Reorder subtasks of one todo atomically. Ids belonging to another
    /// todo count as missing.
    async fn reorder_subtasks(
        &self,
        todo_id: i64,
        positions: &[PositionUpdate],
    ) -> Result<(), DatabaseError>;

    // ── Fixtures ────────────────────────────────────────────────────

    /// Delete every todo and subtask, then insert `todos`, in one transaction.
    /// Returns the resulting list in display order.
    async fn reset_with(&self, todos: &[SeedTodo]) -> Result<Vec<Todo>, DatabaseError>;
}
