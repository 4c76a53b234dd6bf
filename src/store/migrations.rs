//! Schema migrations for the todo store, tracked in `_migrations`.

use libsql::Connection;

use crate::error::DatabaseError;

/// One schema step; `sql` may hold several statements.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Ordered by version. Append only.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                date TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                position INTEGER NOT NULL DEFAULT 0 CHECK (position >= 0),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS subtasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                todo_id INTEGER NOT NULL REFERENCES todos(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                position INTEGER NOT NULL DEFAULT 0 CHECK (position >= 0),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_subtasks_todo_id ON subtasks(todo_id);
        "#,
    },
    Migration {
        version: 2,
        name: "ordering_indexes",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_todos_date ON todos(date);
            CREATE INDEX IF NOT EXISTS idx_todos_order ON todos(position, created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_subtasks_order ON subtasks(todo_id, position, created_at);
        "#,
    },
];

const TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)";

/// Bring the schema up to the newest version.
///
/// Every step runs in its own transaction together with its `_migrations`
/// row, so a failed step leaves the schema at the previous version.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(TRACKING_TABLE, ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("cannot create _migrations: {e}")))?;

    let applied = schema_version(conn).await?;
    let pending = MIGRATIONS.iter().filter(|m| m.version > applied);

    for step in pending {
        apply(conn, step).await?;
        tracing::info!(version = step.version, name = step.name, "Schema migrated");
    }

    let version = schema_version(conn).await?;
    tracing::debug!(version, "Schema up to date");
    Ok(())
}

async fn apply(conn: &Connection, step: &Migration) -> Result<(), DatabaseError> {
    let failed = |what: &str, e: libsql::Error| {
        DatabaseError::Migration(format!("V{} {} {what}: {e}", step.version, step.name))
    };

    let tx = conn.transaction().await.map_err(|e| failed("begin", e))?;
    if let Err(e) = tx.execute_batch(step.sql).await {
        let _ = tx.rollback().await;
        return Err(failed("schema", e));
    }
    if let Err(e) = tx
        .execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            libsql::params![step.version, step.name],
        )
        .await
    {
        let _ = tx.rollback().await;
        return Err(failed("record", e));
    }
    tx.commit().await.map_err(|e| failed("commit", e))
}

/// Highest recorded version; 0 on a fresh database.
async fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let read_failed = |e: libsql::Error| DatabaseError::Migration(format!("cannot read schema version: {e}"));
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(read_failed)?;
    match rows.next().await.map_err(read_failed)? {
        Some(row) => row.get::<i64>(0).map_err(read_failed),
        None => Ok(0),
    }
}
