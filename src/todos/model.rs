//! Todo data model — records, creation input, partial updates, and reorder pairs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subtasks::model::Subtask;

/// A top-level task pinned to a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Storage-generated id.
    pub id: i64,
    pub title: String,
    /// The day this todo belongs to.
    pub date: DateTime<Utc>,
    pub completed: bool,
    /// Display order across all todos (not scoped per date).
    pub position: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Child subtasks ordered by position.
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

/// Input for creating a todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub date: DateTime<Utc>,
    pub position: u32,
}

impl NewTodo {
    pub fn new(title: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            date,
            position: 0,
        }
    }

    /// Builder: set position.
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }
}

/// Partial update for a todo. Only populated fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
    pub position: Option<u32>,
}

impl TodoUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.date.is_none()
            && self.completed.is_none()
            && self.position.is_none()
    }
}

/// One `(id, position)` pair of a reorder batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: i64,
    pub position: u32,
}

impl PositionUpdate {
    pub fn new(id: i64, position: u32) -> Self {
        Self { id, position }
    }
}

/// Parse a todo date.
///
/// Accepts a bare calendar date (`2025-12-03`, midnight UTC), an RFC 3339
/// timestamp, or a naive `YYYY-MM-DDTHH:MM:SS[.fff]` timestamp read as UTC.
pub fn parse_todo_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ndt| ndt.and_utc())
}
