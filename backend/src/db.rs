//! SQLite storage for the `tasks` table.
//!
//! Timestamps are stored as fixed-width ISO-8601 UTC text, so string comparison in SQL
//! orders them chronologically. `updated_at` is kept in the table but never exposed.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use shared::task::iso8601;
use shared::{CreateTaskRequest, Task, TaskFilter, TaskStats, UpdateTaskRequest};
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    deadline TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks (created_at);
";

const SELECT_COLUMNS: &str = "SELECT id, text, completed, deadline, created_at FROM tasks";

pub struct TaskRepository {
    conn: Connection,
}

impl TaskRepository {
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened task database");
        Self::bootstrap(conn)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> rusqlite::Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Newest first; ties keep reverse insertion order.
    pub fn list(&self, filter: TaskFilter) -> rusqlite::Result<Vec<Task>> {
        let condition = match filter {
            TaskFilter::All => "",
            TaskFilter::Pending => " WHERE completed = 0",
            TaskFilter::Completed => " WHERE completed = 1",
        };
        let sql = format!("{SELECT_COLUMNS}{condition} ORDER BY created_at DESC, rowid DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(%filter, count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    pub fn get(&self, id: &str) -> rusqlite::Result<Option<Task>> {
        self.conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()
    }

    /// Inserts a new record. `request.text` must already be validated.
    pub fn create(&self, request: &CreateTaskRequest, now: DateTime<Utc>) -> rusqlite::Result<Task> {
        let task = Task::new(request.text.clone(), request.deadline, now);
        let stamp = iso8601::format(&task.created_at);
        self.conn.execute(
            "INSERT INTO tasks (id, text, completed, deadline, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                task.id,
                task.text,
                task.completed,
                task.deadline.as_ref().map(iso8601::format),
                stamp,
            ],
        )?;
        info!(id = %task.id, "task created");
        Ok(task)
    }

    /// Applies a validated patch. `None` when the id is unknown.
    pub fn update(
        &self,
        id: &str,
        patch: &UpdateTaskRequest,
        now: DateTime<Utc>,
    ) -> rusqlite::Result<Option<Task>> {
        let Some(mut task) = self.get(id)? else {
            return Ok(None);
        };
        patch.apply_to(&mut task);
        self.conn.execute(
            "UPDATE tasks SET text = ?2, completed = ?3, deadline = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                task.id,
                task.text,
                task.completed,
                task.deadline.as_ref().map(iso8601::format),
                iso8601::format(&now),
            ],
        )?;
        debug!(id, "task updated");
        Ok(Some(task))
    }

    /// Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> rusqlite::Result<bool> {
        let removed = self.conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if removed > 0 {
            info!(id, "task deleted");
        }
        Ok(removed > 0)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> rusqlite::Result<TaskStats> {
        let (total, completed, overdue): (i64, i64, i64) = self.conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(completed), 0),
                COALESCE(SUM(CASE WHEN deadline IS NOT NULL AND deadline < ?1 AND completed = 0
                             THEN 1 ELSE 0 END), 0)
             FROM tasks",
            params![iso8601::format(&now)],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(TaskStats {
            total: total as u64,
            completed: completed as u64,
            pending: (total - completed) as u64,
            overdue: overdue as u64,
        })
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let deadline: Option<String> = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(Task {
        id: row.get(0)?,
        text: row.get(1)?,
        completed: row.get(2)?,
        deadline: deadline.map(|raw| parse_timestamp(3, &raw)).transpose()?,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    iso8601::parse(raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err)))
}
