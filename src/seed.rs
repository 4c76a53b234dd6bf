//! Sample data for local development, loaded by the `seed` binary.

use chrono::{DateTime, Utc};

use crate::error::{Result, TodoError};
use crate::store::Database;
use crate::todos::model::{NewTodo, Todo, parse_todo_date};

/// A todo to insert together with its subtasks.
#[derive(Debug, Clone)]
pub struct SeedTodo {
    pub todo: NewTodo,
    pub subtasks: Vec<SeedSubtask>,
}

#[derive(Debug, Clone)]
pub struct SeedSubtask {
    pub title: String,
    pub position: u32,
}

impl SeedTodo {
    fn new(todo: NewTodo) -> Self {
        Self {
            todo,
            subtasks: Vec::new(),
        }
    }

    fn subtask(mut self, title: &str, position: u32) -> Self {
        self.subtasks.push(SeedSubtask {
            title: title.to_string(),
            position,
        });
        self
    }
}

fn day(raw: &str) -> Result<DateTime<Utc>> {
    parse_todo_date(raw).ok_or_else(|| TodoError::InvalidArgument(format!("bad seed date {raw}")))
}

/// The Hogwarts study plan.
pub fn sample_todos() -> Result<Vec<SeedTodo>> {
    Ok(vec![
        SeedTodo::new(NewTodo::new("Study Herbology", day("2025-12-03")?).with_position(0))
            .subtask("Read Chapter 5", 0)
            .subtask("Water Mandrakes", 1),
        SeedTodo::new(NewTodo::new("Practice Charms", day("2025-12-03")?).with_position(1))
            .subtask("Learn Levitation Spell", 0),
        SeedTodo::new(NewTodo::new("Finish Potions Essay", day("2025-12-04")?).with_position(2)),
    ])
}

/// Replace whatever is stored with the sample todos.
pub async fn seed(db: &dyn Database) -> Result<Vec<Todo>> {
    let todos = db.reset_with(&sample_todos()?).await?;
    tracing::info!(todos = todos.len(), "Seed data loaded");
    Ok(todos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;
    use crate::subtasks::model::NewSubtask;

    async fn test_db() -> (tempfile::TempDir, LibSqlBackend) {
        let dir = tempfile::tempdir().unwrap();
        let db = LibSqlBackend::new_local(&dir.path().join("seed.db"))
            .await
            .unwrap();
        (dir, db)
    }

    fn outline(todos: &[Todo]) -> Vec<(String, Vec<String>)> {
        todos
            .iter()
            .map(|t| {
                (
                    t.title.clone(),
                    t.subtasks.iter().map(|s| s.title.clone()).collect(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn seed_loads_study_plan_in_order() {
        let (_dir, db) = test_db().await;
        let seeded = seed(&db).await.unwrap();

        let expected = vec![
            (
                "Study Herbology".to_string(),
                vec!["Read Chapter 5".to_string(), "Water Mandrakes".to_string()],
            ),
            (
                "Practice Charms".to_string(),
                vec!["Learn Levitation Spell".to_string()],
            ),
            ("Finish Potions Essay".to_string(), vec![]),
        ];
        assert_eq!(outline(&seeded), expected);
        assert_eq!(outline(&db.list_todos(None).await.unwrap()), expected);
        assert!(seeded.iter().all(|t| !t.completed));
        assert_eq!(seeded[2].date, day("2025-12-04").unwrap());
    }

    #[tokio::test]
    async fn seed_replaces_existing_rows() {
        let (_dir, db) = test_db().await;
        let old = db
            .insert_todo(&NewTodo::new("Feed Hedwig", day("2025-12-01").unwrap()))
            .await
            .unwrap();
        db.insert_subtask(&NewSubtask::new(old.id, "Owl treats"))
            .await
            .unwrap();

        seed(&db).await.unwrap();
        let again = seed(&db).await.unwrap();

        assert_eq!(again.len(), 3);
        assert!(db.get_todo(old.id).await.unwrap().is_none());
        assert!(db.list_subtasks(old.id).await.unwrap().is_empty());
    }
}
