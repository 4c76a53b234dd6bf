//! Request bodies and the checks run on them before anything reaches the
//! repositories. Each body converts into the typed input of one operation,
//! or into the list of fields that failed.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;

use super::envelope::FieldError;
use crate::subtasks::model::{NewSubtask, SubtaskUpdate};
use crate::todos::model::{NewTodo, PositionUpdate, TodoUpdate, parse_todo_date};

pub const MAX_TITLE_CHARS: usize = 255;

pub type Checked<T> = Result<T, Vec<FieldError>>;

/// Parse a positive integer id from a path segment.
pub fn id_param(raw: &str, entity: &str) -> Checked<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(vec![FieldError::new("id", format!("Invalid {entity} ID"))]),
    }
}

/// Integers may arrive as JSON numbers or numeric strings (form posts).
fn int_or_numeric_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected an integer, got {s:?}"))),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "int_or_numeric_string")]
    pub position: Option<i64>,
}

impl CreateTodoRequest {
    pub fn validate(self) -> Checked<NewTodo> {
        let mut errors = Vec::new();
        let title = required_title(self.title, &mut errors);
        let date = match self.date {
            Some(raw) => date(&raw, &mut errors),
            None => {
                errors.push(FieldError::new("date", "Date is required"));
                None
            }
        };
        let position = position("position", self.position, &mut errors);

        match (title, date) {
            (Some(title), Some(date)) if errors.is_empty() => {
                Ok(NewTodo::new(title, date).with_position(position.unwrap_or(0)))
            }
            _ => Err(errors),
        }
    }
}

/// Partial todo update; absent or `null` fields are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "int_or_numeric_string")]
    pub position: Option<i64>,
}

impl UpdateTodoRequest {
    pub fn validate(self) -> Checked<TodoUpdate> {
        let mut errors = Vec::new();
        let update = TodoUpdate {
            title: self.title.and_then(|raw| optional_title(raw, &mut errors)),
            date: self.date.and_then(|raw| date(&raw, &mut errors)),
            completed: self.completed,
            position: position("position", self.position, &mut errors),
        };
        if errors.is_empty() { Ok(update) } else { Err(errors) }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PositionItem {
    #[serde(default, deserialize_with = "int_or_numeric_string")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "int_or_numeric_string")]
    pub position: Option<i64>,
}

/// `{positions: [{id, position}, ...]}`, used by both reorder endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub positions: Option<Vec<PositionItem>>,
}

impl ReorderRequest {
    pub fn validate(self) -> Checked<Vec<PositionUpdate>> {
        let items = match self.positions {
            Some(items) if !items.is_empty() => items,
            _ => {
                return Err(vec![FieldError::new(
                    "positions",
                    "positions must be a non-empty array",
                )]);
            }
        };

        let mut errors = Vec::new();
        let mut updates = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let id = item.id.filter(|id| *id >= 1);
            if id.is_none() {
                errors.push(FieldError::new(
                    format!("positions[{index}].id"),
                    "Each position item must have a valid id",
                ));
            }
            let position = item.position.and_then(|p| u32::try_from(p).ok());
            if position.is_none() {
                errors.push(FieldError::new(
                    format!("positions[{index}].position"),
                    "Each position value must be a non-negative integer",
                ));
            }
            if let (Some(id), Some(position)) = (id, position) {
                updates.push(PositionUpdate::new(id, position));
            }
        }

        if errors.is_empty() { Ok(updates) } else { Err(errors) }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubtaskRequest {
    #[serde(default, deserialize_with = "int_or_numeric_string")]
    pub todo_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "int_or_numeric_string")]
    pub position: Option<i64>,
}

impl CreateSubtaskRequest {
    pub fn validate(self) -> Checked<NewSubtask> {
        let mut errors = Vec::new();
        let todo_id = self.todo_id.filter(|id| *id >= 1);
        if todo_id.is_none() {
            errors.push(FieldError::new("todoId", "Valid todoId is required"));
        }
        let title = required_title(self.title, &mut errors);
        let position = position("position", self.position, &mut errors);

        match (todo_id, title) {
            (Some(todo_id), Some(title)) if errors.is_empty() => {
                Ok(NewSubtask::new(todo_id, title).with_position(position.unwrap_or(0)))
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSubtaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "int_or_numeric_string")]
    pub position: Option<i64>,
}

impl UpdateSubtaskRequest {
    pub fn validate(self) -> Checked<SubtaskUpdate> {
        let mut errors = Vec::new();
        let update = SubtaskUpdate {
            title: self.title.and_then(|raw| optional_title(raw, &mut errors)),
            completed: self.completed,
            position: position("position", self.position, &mut errors),
        };
        if errors.is_empty() { Ok(update) } else { Err(errors) }
    }
}

// ── Field checks ────────────────────────────────────────────────────

fn title(raw: &str, empty: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new("title", empty));
        None
    } else if trimmed.chars().count() > MAX_TITLE_CHARS {
        errors.push(FieldError::new(
            "title",
            format!("Title must be at most {MAX_TITLE_CHARS} characters"),
        ));
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn required_title(raw: Option<String>, errors: &mut Vec<FieldError>) -> Option<String> {
    match raw {
        Some(raw) => title(&raw, "Title is required", errors),
        None => {
            errors.push(FieldError::new("title", "Title is required"));
            None
        }
    }
}

fn optional_title(raw: String, errors: &mut Vec<FieldError>) -> Option<String> {
    title(&raw, "Title cannot be empty", errors)
}

fn date(raw: &str, errors: &mut Vec<FieldError>) -> Option<DateTime<Utc>> {
    let parsed = parse_todo_date(raw);
    if parsed.is_none() {
        errors.push(FieldError::new("date", "Invalid date format"));
    }
    parsed
}

fn position(field: &str, raw: Option<i64>, errors: &mut Vec<FieldError>) -> Option<u32> {
    let raw = raw?;
    let position = u32::try_from(raw).ok();
    if position.is_none() {
        errors.push(FieldError::new(field, "Position must be a non-negative integer"));
    }
    position
}

#[cfg(test)]
mod tests {
    use serde::de::DeserializeOwned;
    use serde_json::{Value, json};

    use super::*;

    fn body<T: DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn new_todo_defaults_position_and_trims_title() {
        let todo = body::<CreateTodoRequest>(json!({"title": "  Study Herbology ", "date": "2025-12-03"}))
            .validate()
            .unwrap();
        assert_eq!(todo.title, "Study Herbology");
        assert_eq!(todo.position, 0);
        assert_eq!(todo.date, parse_todo_date("2025-12-03").unwrap());
    }

    #[test]
    fn new_todo_reports_every_bad_field() {
        let errors = body::<CreateTodoRequest>(json!({"title": "   ", "position": -1}))
            .validate()
            .unwrap_err();
        assert_eq!(fields(&errors), vec!["title", "date", "position"]);
    }

    #[test]
    fn long_titles_are_rejected() {
        let long = "x".repeat(MAX_TITLE_CHARS + 1);
        let errors = body::<CreateTodoRequest>(json!({"title": long, "date": "2025-12-03"}))
            .validate()
            .unwrap_err();
        assert!(errors[0].message.contains("at most"));
    }

    #[test]
    fn update_only_carries_present_fields() {
        let update = body::<UpdateTodoRequest>(json!({"completed": true, "title": null}))
            .validate()
            .unwrap();
        assert_eq!(update.completed, Some(true));
        assert!(update.title.is_none() && update.date.is_none() && update.position.is_none());

        let errors = body::<UpdateTodoRequest>(json!({"date": "soon", "title": "", "position": -2}))
            .validate()
            .unwrap_err();
        assert_eq!(fields(&errors), vec!["title", "date", "position"]);
    }

    #[test]
    fn wrongly_typed_fields_fail_to_parse() {
        assert!(serde_json::from_value::<UpdateTodoRequest>(json!({"completed": "yes"})).is_err());
        assert!(serde_json::from_value::<CreateTodoRequest>(json!({"position": "third"})).is_err());
        assert!(serde_json::from_value::<ReorderRequest>(json!([1, 2])).is_err());
    }

    #[test]
    fn positions_require_non_empty_array() {
        assert!(body::<ReorderRequest>(json!({"positions": []})).validate().is_err());
        assert!(body::<ReorderRequest>(json!({})).validate().is_err());

        let parsed = body::<ReorderRequest>(
            json!({"positions": [{"id": 1, "position": 2}, {"id": "2", "position": "1"}]}),
        )
        .validate()
        .unwrap();
        assert_eq!(parsed, vec![PositionUpdate::new(1, 2), PositionUpdate::new(2, 1)]);
    }

    #[test]
    fn positions_report_bad_entries_by_index() {
        let errors = body::<ReorderRequest>(
            json!({"positions": [{"id": 0, "position": 1}, {"id": 2, "position": -3}, {"position": 4}]}),
        )
        .validate()
        .unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["positions[0].id", "positions[1].position", "positions[2].id"]
        );
    }

    #[test]
    fn new_subtask_needs_todo_id() {
        let sub = body::<CreateSubtaskRequest>(json!({"todoId": "4", "title": "Read Chapter 5"}))
            .validate()
            .unwrap();
        assert_eq!(sub.todo_id, 4);
        assert_eq!(sub.position, 0);

        let errors = body::<CreateSubtaskRequest>(json!({"title": "orphan"}))
            .validate()
            .unwrap_err();
        assert_eq!(fields(&errors), vec!["todoId"]);
    }

    #[test]
    fn empty_subtask_update_is_allowed() {
        assert!(body::<UpdateSubtaskRequest>(json!({})).validate().unwrap().is_empty());
    }

    #[test]
    fn id_params() {
        assert_eq!(id_param("12", "todo").unwrap(), 12);
        assert!(id_param("0", "todo").is_err());
        assert_eq!(id_param("abc", "subtask").unwrap_err()[0].message, "Invalid subtask ID");
    }
}
