//! libSQL backend — async `Database` trait implementation.
//!
//! Opens a local database file and hands out one connection per logical
//! operation. Every connection enables foreign keys (so subtask rows cascade
//! with their todo) and waits on a busy timeout instead of failing when
//! another writer holds the lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, Transaction, TransactionBehavior, params};
use tracing::{info, warn};

use crate::error::DatabaseError;
use crate::seed::SeedTodo;
use crate::store::migrations;
use crate::store::traits::Database;
use crate::subtasks::model::{NewSubtask, Subtask, SubtaskUpdate};
use crate::todos::model::{NewTodo, PositionUpdate, Todo, TodoUpdate};

const BUSY_TIMEOUT_MS: u32 = 5_000;

/// libSQL database backend.
pub struct LibSqlBackend {
    db: LibSqlDatabase,
    path: PathBuf,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Pool(format!("Failed to create database directory: {e}"))
                })?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self {
            db,
            path: path.to_path_buf(),
        };

        let conn = backend.connect().await?;
        // journal_mode answers with a row, so it has to go through query().
        conn.query("PRAGMA journal_mode = WAL", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to enable WAL: {e}")))?;

        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Acquire a fresh connection for one logical operation.
    async fn connect(&self) -> Result<Connection, DatabaseError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to enable foreign keys: {e}")))?;
        conn.query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"), ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to set busy timeout: {e}")))?;

        Ok(conn)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical timestamp text. Fixed width, so lexical order is chronological.
fn format_ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a driver failure onto a storage error kind.
///
/// SQLite reports constraint failures as text ("FOREIGN KEY constraint
/// failed", "UNIQUE constraint failed: ..."), which is stable across the
/// local and remote libSQL drivers.
fn classify(op: &str, err: libsql::Error) -> DatabaseError {
    let msg = err.to_string();
    if msg.contains("FOREIGN KEY constraint failed") {
        DatabaseError::ForeignKey(format!("{op}: {msg}"))
    } else if msg.contains("UNIQUE constraint failed")
        || msg.contains("PRIMARY KEY constraint failed")
    {
        DatabaseError::Unique(format!("{op}: {msg}"))
    } else if msg.contains("constraint failed") {
        DatabaseError::Constraint(format!("{op}: {msg}"))
    } else {
        DatabaseError::Query(format!("{op}: {msg}"))
    }
}

async fn begin(conn: &Connection, op: &str) -> Result<Transaction, DatabaseError> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .await
        .map_err(|e| DatabaseError::Transaction(format!("{op} begin: {e}")))
}

async fn begin_read(conn: &Connection, op: &str) -> Result<Transaction, DatabaseError> {
    conn.transaction_with_behavior(TransactionBehavior::Deferred)
        .await
        .map_err(|e| DatabaseError::Transaction(format!("{op} begin: {e}")))
}

/// Commit on success, roll back on failure, and hand back the body's result.
async fn finish<T>(
    tx: Transaction,
    op: &str,
    result: Result<T, DatabaseError>,
) -> Result<T, DatabaseError> {
    match result {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| DatabaseError::Transaction(format!("{op} commit: {e}")))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(op, error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

const TODO_COLUMNS: &str = "id, title, date, completed, position, created_at, updated_at";

const SUBTASK_COLUMNS: &str = "id, todo_id, title, completed, position, created_at, updated_at";

const TODO_ORDER: &str = "position ASC, created_at DESC, id DESC";

const SUBTASK_ORDER: &str = "position ASC, created_at ASC, id ASC";

/// Map a libsql Row to a Todo (without subtasks).
///
/// Column order matches TODO_COLUMNS.
fn row_to_todo(row: &libsql::Row) -> Result<Todo, DatabaseError> {
    let parse = |e: libsql::Error| DatabaseError::Query(format!("todo row parse: {e}"));
    let date: String = row.get(2).map_err(parse)?;
    let created: String = row.get(5).map_err(parse)?;
    let updated: String = row.get(6).map_err(parse)?;
    Ok(Todo {
        id: row.get(0).map_err(parse)?,
        title: row.get(1).map_err(parse)?,
        date: parse_datetime(&date),
        completed: row.get::<i64>(3).map_err(parse)? != 0,
        position: row.get::<i64>(4).map_err(parse)?.max(0) as u32,
        created_at: parse_datetime(&created),
        updated_at: parse_datetime(&updated),
        subtasks: Vec::new(),
    })
}

/// Map a libsql Row to a Subtask. Column order matches SUBTASK_COLUMNS.
fn row_to_subtask(row: &libsql::Row) -> Result<Subtask, DatabaseError> {
    let parse = |e: libsql::Error| DatabaseError::Query(format!("subtask row parse: {e}"));
    let created: String = row.get(5).map_err(parse)?;
    let updated: String = row.get(6).map_err(parse)?;
    Ok(Subtask {
        id: row.get(0).map_err(parse)?,
        todo_id: row.get(1).map_err(parse)?,
        title: row.get(2).map_err(parse)?,
        completed: row.get::<i64>(3).map_err(parse)? != 0,
        position: row.get::<i64>(4).map_err(parse)?.max(0) as u32,
        created_at: parse_datetime(&created),
        updated_at: parse_datetime(&updated),
    })
}

async fn query_todos(
    conn: &Connection,
    op: &str,
    sql: &str,
    args: Vec<libsql::Value>,
) -> Result<Vec<Todo>, DatabaseError> {
    let mut rows = conn.query(sql, args).await.map_err(|e| classify(op, e))?;
    let mut todos = Vec::new();
    while let Some(row) = rows.next().await.map_err(|e| classify(op, e))? {
        todos.push(row_to_todo(&row)?);
    }
    Ok(todos)
}

async fn query_subtasks(
    conn: &Connection,
    op: &str,
    sql: &str,
    args: Vec<libsql::Value>,
) -> Result<Vec<Subtask>, DatabaseError> {
    let mut rows = conn.query(sql, args).await.map_err(|e| classify(op, e))?;
    let mut subtasks = Vec::new();
    while let Some(row) = rows.next().await.map_err(|e| classify(op, e))? {
        subtasks.push(row_to_subtask(&row)?);
    }
    Ok(subtasks)
}

/// Load one todo plus its ordered subtasks on an existing connection.
async fn fetch_todo(conn: &Connection, id: i64) -> Result<Option<Todo>, DatabaseError> {
    let todo = query_todos(
        conn,
        "get_todo",
        &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"),
        vec![libsql::Value::Integer(id)],
    )
    .await?
    .into_iter()
    .next();

    match todo {
        Some(mut todo) => {
            todo.subtasks = fetch_subtasks(conn, id).await?;
            Ok(Some(todo))
        }
        None => Ok(None),
    }
}

async fn fetch_subtasks(conn: &Connection, todo_id: i64) -> Result<Vec<Subtask>, DatabaseError> {
    query_subtasks(
        conn,
        "list_subtasks",
        &format!("SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE todo_id = ?1 ORDER BY {SUBTASK_ORDER}"),
        vec![libsql::Value::Integer(todo_id)],
    )
    .await
}

async fn fetch_subtask(conn: &Connection, id: i64) -> Result<Option<Subtask>, DatabaseError> {
    Ok(query_subtasks(
        conn,
        "get_subtask",
        &format!("SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE id = ?1"),
        vec![libsql::Value::Integer(id)],
    )
    .await?
    .into_iter()
    .next())
}

/// Read todos and the subtasks that belong to them, then attach each
/// subtask list to its parent. Both reads run on the caller's snapshot.
async fn fetch_todo_tree(
    conn: &Connection,
    date: Option<&str>,
) -> Result<Vec<Todo>, DatabaseError> {
    let (todo_filter, subtask_filter, args) = match date {
        Some(date) => (
            "WHERE date = ?1",
            "WHERE todo_id IN (SELECT id FROM todos WHERE date = ?1)",
            vec![libsql::Value::Text(date.to_string())],
        ),
        None => ("", "", Vec::new()),
    };

    let mut todos = query_todos(
        conn,
        "list_todos",
        &format!("SELECT {TODO_COLUMNS} FROM todos {todo_filter} ORDER BY {TODO_ORDER}"),
        args.clone(),
    )
    .await?;

    let subtasks = query_subtasks(
        conn,
        "list_todos subtasks",
        &format!("SELECT {SUBTASK_COLUMNS} FROM subtasks {subtask_filter} ORDER BY {SUBTASK_ORDER}"),
        args,
    )
    .await?;

    let mut by_parent: HashMap<i64, Vec<Subtask>> = HashMap::new();
    for subtask in subtasks {
        by_parent.entry(subtask.todo_id).or_default().push(subtask);
    }
    for todo in &mut todos {
        todo.subtasks = by_parent.remove(&todo.id).unwrap_or_default();
    }
    Ok(todos)
}

/// Insert a todo row on `conn` and return its id.
async fn insert_todo_row(conn: &Connection, todo: &NewTodo, now: &str) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO todos (title, date, completed, position, created_at, updated_at)
         VALUES (?1, ?2, 0, ?3, ?4, ?5)",
        params![
            todo.title.as_str(),
            format_ts(&todo.date),
            i64::from(todo.position),
            now,
            now,
        ],
    )
    .await
    .map_err(|e| classify("insert_todo", e))?;
    Ok(conn.last_insert_rowid())
}

async fn insert_subtask_row(
    conn: &Connection,
    subtask: &NewSubtask,
    now: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO subtasks (todo_id, title, completed, position, created_at, updated_at)
         VALUES (?1, ?2, 0, ?3, ?4, ?5)",
        params![
            subtask.todo_id,
            subtask.title.as_str(),
            i64::from(subtask.position),
            now,
            now,
        ],
    )
    .await
    .map_err(|e| classify("insert_subtask", e))?;
    Ok(conn.last_insert_rowid())
}

/// Apply a batch of position updates on `conn`, failing on the first id
/// that matches no row. `scope` restricts subtask updates to one parent.
async fn apply_positions(
    conn: &Connection,
    table: &str,
    entity: &str,
    scope: Option<i64>,
    positions: &[PositionUpdate],
) -> Result<(), DatabaseError> {
    let now = format_ts(&Utc::now());
    let sql = match scope {
        Some(_) => format!("UPDATE {table} SET position = ?1, updated_at = ?2 WHERE id = ?3 AND todo_id = ?4"),
        None => format!("UPDATE {table} SET position = ?1, updated_at = ?2 WHERE id = ?3"),
    };

    for item in positions {
        let mut args = vec![
            libsql::Value::Integer(i64::from(item.position)),
            libsql::Value::Text(now.clone()),
            libsql::Value::Integer(item.id),
        ];
        if let Some(todo_id) = scope {
            args.push(libsql::Value::Integer(todo_id));
        }
        let changed = conn
            .execute(&sql, args)
            .await
            .map_err(|e| classify("reorder", e))?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: entity.to_string(),
                id: item.id,
            });
        }
    }
    Ok(())
}

/// Build the `SET` clause and arguments of a partial update. `updated_at`
/// is always touched; the row id is bound last.
fn build_update(
    fields: Vec<(&'static str, libsql::Value)>,
    id: i64,
) -> (String, Vec<libsql::Value>) {
    let mut sets = Vec::with_capacity(fields.len() + 1);
    let mut args = Vec::with_capacity(fields.len() + 2);
    for (column, value) in fields {
        sets.push(format!("{column} = ?"));
        args.push(value);
    }
    sets.push("updated_at = ?".to_string());
    args.push(libsql::Value::Text(format_ts(&Utc::now())));
    args.push(libsql::Value::Integer(id));
    (sets.join(", "), args)
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        migrations::run_migrations(&conn).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query("SELECT 1", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("ping: {e}")))?;
        rows.next()
            .await
            .map_err(|e| DatabaseError::Pool(format!("ping: {e}")))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        conn.query("PRAGMA wal_checkpoint(TRUNCATE)", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("checkpoint on close: {e}")))?;
        info!(path = %self.path.display(), "Database closed");
        Ok(())
    }

    // ── Todos ───────────────────────────────────────────────────────

    async fn list_todos(&self, date: Option<DateTime<Utc>>) -> Result<Vec<Todo>, DatabaseError> {
        let conn = self.connect().await?;
        let date = date.map(|d| format_ts(&d));
        let tx = begin_read(&conn, "list_todos").await?;
        let result = fetch_todo_tree(&tx, date.as_deref()).await;
        finish(tx, "list_todos", result).await
    }

    async fn get_todo(&self, id: i64) -> Result<Option<Todo>, DatabaseError> {
        let conn = self.connect().await?;
        let tx = begin_read(&conn, "get_todo").await?;
        let result = fetch_todo(&tx, id).await;
        finish(tx, "get_todo", result).await
    }

    async fn todo_exists(&self, id: i64) -> Result<bool, DatabaseError> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query("SELECT 1 FROM todos WHERE id = ?1", params![id])
            .await
            .map_err(|e| classify("todo_exists", e))?;
        let row = rows.next().await.map_err(|e| classify("todo_exists", e))?;
        Ok(row.is_some())
    }

    async fn insert_todo(&self, todo: &NewTodo) -> Result<Todo, DatabaseError> {
        let conn = self.connect().await?;
        let id = insert_todo_row(&conn, todo, &format_ts(&Utc::now())).await?;
        fetch_todo(&conn, id).await?.ok_or(DatabaseError::NotFound {
            entity: "Todo".to_string(),
            id,
        })
    }

    async fn update_todo(
        &self,
        id: i64,
        update: &TodoUpdate,
    ) -> Result<Option<Todo>, DatabaseError> {
        let mut fields = Vec::new();
        if let Some(title) = &update.title {
            fields.push(("title", libsql::Value::Text(title.clone())));
        }
        if let Some(date) = &update.date {
            fields.push(("date", libsql::Value::Text(format_ts(date))));
        }
        if let Some(completed) = update.completed {
            fields.push(("completed", libsql::Value::Integer(i64::from(completed))));
        }
        if let Some(position) = update.position {
            fields.push(("position", libsql::Value::Integer(i64::from(position))));
        }
        let (sets, args) = build_update(fields, id);

        let conn = self.connect().await?;
        let tx = begin(&conn, "update_todo").await?;
        let result: Result<Option<Todo>, DatabaseError> = async {
            let changed = tx
                .execute(&format!("UPDATE todos SET {sets} WHERE id = ?"), args)
                .await
                .map_err(|e| classify("update_todo", e))?;
            if changed == 0 {
                return Ok(None);
            }
            fetch_todo(&tx, id).await
        }
        .await;
        finish(tx, "update_todo", result).await
    }

    async fn toggle_todo(&self, id: i64) -> Result<Option<Todo>, DatabaseError> {
        let conn = self.connect().await?;
        let tx = begin(&conn, "toggle_todo").await?;
        let result: Result<Option<Todo>, DatabaseError> = async {
            let changed = tx
                .execute(
                    "UPDATE todos SET completed = 1 - completed, updated_at = ?1 WHERE id = ?2",
                    params![format_ts(&Utc::now()), id],
                )
                .await
                .map_err(|e| classify("toggle_todo", e))?;
            if changed == 0 {
                return Ok(None);
            }
            fetch_todo(&tx, id).await
        }
        .await;
        finish(tx, "toggle_todo", result).await
    }

    async fn delete_todo(&self, id: i64) -> Result<Option<Todo>, DatabaseError> {
        let conn = self.connect().await?;
        let tx = begin(&conn, "delete_todo").await?;
        let result: Result<Option<Todo>, DatabaseError> = async {
            let Some(todo) = fetch_todo(&tx, id).await? else {
                return Ok(None);
            };
            tx.execute("DELETE FROM todos WHERE id = ?1", params![id])
                .await
                .map_err(|e| classify("delete_todo", e))?;
            Ok(Some(todo))
        }
        .await;
        finish(tx, "delete_todo", result).await
    }

    async fn reorder_todos(&self, positions: &[PositionUpdate]) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        let tx = begin(&conn, "reorder_todos").await?;
        let result = apply_positions(&tx, "todos", "Todo", None, positions).await;
        finish(tx, "reorder_todos", result).await
    }

    // ── Subtasks ────────────────────────────────────────────────────

    async fn list_subtasks(&self, todo_id: i64) -> Result<Vec<Subtask>, DatabaseError> {
        let conn = self.connect().await?;
        fetch_subtasks(&conn, todo_id).await
    }

    async fn get_subtask(&self, id: i64) -> Result<Option<Subtask>, DatabaseError> {
        let conn = self.connect().await?;
        fetch_subtask(&conn, id).await
    }

    async fn insert_subtask(&self, subtask: &NewSubtask) -> Result<Subtask, DatabaseError> {
        let conn = self.connect().await?;
        let id = insert_subtask_row(&conn, subtask, &format_ts(&Utc::now())).await?;
        fetch_subtask(&conn, id).await?.ok_or(DatabaseError::NotFound {
            entity: "Subtask".to_string(),
            id,
        })
    }

    async fn update_subtask(
        &self,
        id: i64,
        update: &SubtaskUpdate,
    ) -> Result<Option<Subtask>, DatabaseError> {
        let mut fields = Vec::new();
        if let Some(title) = &update.title {
            fields.push(("title", libsql::Value::Text(title.clone())));
        }
        if let Some(completed) = update.completed {
            fields.push(("completed", libsql::Value::Integer(i64::from(completed))));
        }
        if let Some(position) = update.position {
            fields.push(("position", libsql::Value::Integer(i64::from(position))));
        }
        let (sets, args) = build_update(fields, id);

        let conn = self.connect().await?;
        let tx = begin(&conn, "update_subtask").await?;
        let result: Result<Option<Subtask>, DatabaseError> = async {
            let changed = tx
                .execute(&format!("UPDATE subtasks SET {sets} WHERE id = ?"), args)
                .await
                .map_err(|e| classify("update_subtask", e))?;
            if changed == 0 {
                return Ok(None);
            }
            fetch_subtask(&tx, id).await
        }
        .await;
        finish(tx, "update_subtask", result).await
    }

    async fn toggle_subtask(&self, id: i64) -> Result<Option<Subtask>, DatabaseError> {
        let conn = self.connect().await?;
        let tx = begin(&conn, "toggle_subtask").await?;
        let result: Result<Option<Subtask>, DatabaseError> = async {
            let changed = tx
                .execute(
                    "UPDATE subtasks SET completed = 1 - completed, updated_at = ?1 WHERE id = ?2",
                    params![format_ts(&Utc::now()), id],
                )
                .await
                .map_err(|e| classify("toggle_subtask", e))?;
            if changed == 0 {
                return Ok(None);
            }
            fetch_subtask(&tx, id).await
        }
        .await;
        finish(tx, "toggle_subtask", result).await
    }

    async fn delete_subtask(&self, id: i64) -> Result<Option<Subtask>, DatabaseError> {
        let conn = self.connect().await?;
        let tx = begin(&conn, "delete_subtask").await?;
        let result: Result<Option<Subtask>, DatabaseError> = async {
            let Some(subtask) = fetch_subtask(&tx, id).await? else {
                return Ok(None);
            };
            tx.execute("DELETE FROM subtasks WHERE id = ?1", params![id])
                .await
                .map_err(|e| classify("delete_subtask", e))?;
            Ok(Some(subtask))
        }
        .await;
        finish(tx, "delete_subtask", result).await
    }

    async fn reorder_subtasks(
        &self,
        todo_id: i64,
        positions: &[PositionUpdate],
    ) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        let tx = begin(&conn, "reorder_subtasks").await?;
        let result = apply_positions(&tx, "subtasks", "Subtask", Some(todo_id), positions).await;
        finish(tx, "reorder_subtasks", result).await
    }

    async fn reset_with(&self, todos: &[SeedTodo]) -> Result<Vec<Todo>, DatabaseError> {
        let conn = self.connect().await?;
        let tx = begin(&conn, "reset_with").await?;
        let result: Result<Vec<Todo>, DatabaseError> = async {
            tx.execute_batch("DELETE FROM subtasks; DELETE FROM todos;")
                .await
                .map_err(|e| classify("reset_with", e))?;

            let now = format_ts(&Utc::now());
            for seed in todos {
                let todo_id = insert_todo_row(&tx, &seed.todo, &now).await?;
                for sub in &seed.subtasks {
                    let child = NewSubtask::new(todo_id, sub.title.clone()).with_position(sub.position);
                    insert_subtask_row(&tx, &child, &now).await?;
                }
            }
            fetch_todo_tree(&tx, None).await
        }
        .await;
        finish(tx, "reset_with", result).await
    }
}

// ── Tests ───────────────────────────────────────────────────────────
