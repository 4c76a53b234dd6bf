//! Subtask data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A child task owned by exactly one todo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: i64,
    /// Owning todo.
    pub todo_id: i64,
    pub title: String,
    pub completed: bool,
    /// Display order among siblings of the same todo.
    pub position: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a subtask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubtask {
    pub todo_id: i64,
    pub title: String,
    pub position: u32,
}

impl NewSubtask {
    pub fn new(todo_id: i64, title: impl Into<String>) -> Self {
        Self {
            todo_id,
            title: title.into(),
            position: 0,
        }
    }

    /// Builder: set position.
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }
}

/// Partial update for a subtask. Only populated fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtaskUpdate {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub position: Option<u32>,
}

impl SubtaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none() && self.position.is_none()
    }
}
