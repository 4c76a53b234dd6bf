//! Error types for the todo service.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Storage-level errors raised by the `Database` gateway.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: i64 },

    #[error("Foreign key constraint failed: {0}")]
    ForeignKey(String),

    #[error("Unique constraint failed: {0}")]
    Unique(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Domain errors surfaced by the todo and subtask repositories.
///
/// This is the closed set of failure kinds callers of the core ever see;
/// storage-specific signals are translated into one of these.
#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Referential integrity violated: {0}")]
    ReferentialIntegrity(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage failure: {0}")]
    TransientStorage(String),
}

impl TodoError {
    pub fn todo_not_found(id: i64) -> Self {
        Self::NotFound { entity: "Todo", id }
    }

    pub fn subtask_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "Subtask",
            id,
        }
    }
}

impl From<DatabaseError> for TodoError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity, id } => Self::NotFound {
                entity: if entity == "Subtask" { "Subtask" } else { "Todo" },
                id,
            },
            DatabaseError::ForeignKey(msg) | DatabaseError::Constraint(msg) => {
                Self::ReferentialIntegrity(msg)
            }
            DatabaseError::Unique(msg) => Self::Conflict(msg),
            other => Self::TransientStorage(other.to_string()),
        }
    }
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, TodoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_key_maps_to_referential_integrity() {
        let err: TodoError = DatabaseError::ForeignKey("subtasks.todo_id".into()).into();
        assert!(matches!(err, TodoError::ReferentialIntegrity(_)));
    }

    #[test]
    fn unique_maps_to_conflict() {
        let err: TodoError = DatabaseError::Unique("todos.id".into()).into();
        assert!(matches!(err, TodoError::Conflict(_)));
    }

    #[test]
    fn not_found_keeps_entity_and_id() {
        let err: TodoError = DatabaseError::NotFound {
            entity: "Subtask".into(),
            id: 7,
        }
        .into();
        match err {
            TodoError::NotFound { entity, id } => {
                assert_eq!(entity, "Subtask");
                assert_eq!(id, 7);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(TodoError::todo_not_found(3).to_string(), "Todo not found");
    }

    #[test]
    fn unrecognized_storage_failures_are_transient() {
        let err: TodoError = DatabaseError::Pool("disk gone".into()).into();
        assert!(matches!(err, TodoError::TransientStorage(_)));
        let err: TodoError = DatabaseError::Transaction("busy".into()).into();
        assert!(matches!(err, TodoError::TransientStorage(_)));
    }
}
