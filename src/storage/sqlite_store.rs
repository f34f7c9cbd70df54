use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::types::Type;
use r2d2_sqlite::rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row, TransactionBehavior};
use r2d2_sqlite::SqliteConnectionManager;

use crate::errors::{Result, StorageError};
use crate::storage::backend::TodoStorage;
use crate::todo::{normalize_text, Todo, TodoId, TodoStatus};

/// Schema version stored in `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;

/// SQLite-backed todo store.
///
/// Holds a single connection for its whole lifetime; every operation runs in
/// its own transaction (deferred for reads, immediate for writes) on a
/// blocking worker thread.
pub struct SqliteTodoStore {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteTodoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTodoStore").field("path", &self.path).finish_non_exhaustive()
    }
}

impl SqliteTodoStore {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    ///
    /// This blocks on file I/O; async callers should run it on a blocking thread.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let manager = SqliteConnectionManager::file(&path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE |
                    OpenFlags::SQLITE_OPEN_CREATE |
                    OpenFlags::SQLITE_OPEN_URI
            )
            .with_init(|c| {
                c.busy_timeout(Duration::from_millis(500))?;
                c.pragma_update(None, "journal_mode", "WAL")?;
                Ok(())
            });

        // One connection, kept open until the store is dropped.
        let pool = Pool::builder()
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .connection_timeout(Duration::from_secs(2))
            .build(manager)?;

        let mut conn = pool.get()?;
        migrate(&mut conn)?;
        drop(conn);
        log::info!("opened todo database at {}", path.display());

        Ok(Self { pool, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` against the shared connection on a blocking worker thread.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn: PooledConnection<SqliteConnectionManager> = pool.get()?;
            f(&mut *conn)
        })
        .await?
    }
}

/// Creates the `todos` table if absent and stamps the schema version. Safe to run on every open.
fn migrate(conn: &mut Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(StorageError::persistence(format!(
            "database schema version {version} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS todos (
            id INTEGER PRIMARY KEY,
            text TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'todo',
            create_time TEXT NOT NULL,
            completed_time TEXT
        );"
    )?;
    if version < SCHEMA_VERSION {
        log::debug!("upgrading todo schema from version {version} to {SCHEMA_VERSION}");
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    tx.commit()?;
    Ok(())
}

fn row_to_todo(row: &Row<'_>) -> r2d2_sqlite::rusqlite::Result<Todo> {
    let status: String = row.get(2)?;
    let status = status
        .parse::<TodoStatus>()
        .map_err(|e| r2d2_sqlite::rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(Todo {
        id: row.get(0)?,
        text: row.get(1)?,
        status,
        create_time: row.get(3)?,
        completed_time: row.get(4)?,
    })
}

fn select_todo(conn: &Connection, id: TodoId) -> Result<Option<Todo>> {
    Ok(conn
        .query_row(
            "SELECT id, text, status, create_time, completed_time FROM todos WHERE id = ?1",
            params![id],
            row_to_todo,
        )
        .optional()?)
}

fn wall_clock_id() -> TodoId {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as TodoId)
        .unwrap_or_default()
}

#[async_trait]
impl TodoStorage for SqliteTodoStore {
    async fn get_all_todos(&self) -> Result<Vec<Todo>> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
            let todos = {
                let mut stmt = tx.prepare(
                    "SELECT id, text, status, create_time, completed_time FROM todos ORDER BY id",
                )?;
                let rows = stmt.query_map([], row_to_todo)?;
                rows.collect::<r2d2_sqlite::rusqlite::Result<Vec<_>>>()?
            };
            tx.commit()?;
            Ok(todos)
        })
        .await
    }

    async fn add_todo(&self, text: &str) -> Result<Todo> {
        let text = normalize_text(text).ok_or(StorageError::EmptyText)?.to_string();

        let todo = self
            .with_conn(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                // Millisecond ids collide under rapid inserts; stay above the current maximum.
                let max: Option<TodoId> = tx.query_row("SELECT MAX(id) FROM todos", [], |row| row.get(0))?;
                let id = match max {
                    Some(max) if max >= wall_clock_id() => max + 1,
                    _ => wall_clock_id(),
                };

                let todo = Todo::new(id, text);
                tx.execute(
                    "INSERT INTO todos (id, text, status, create_time, completed_time)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![todo.id, todo.text, todo.status.as_str(), todo.create_time, todo.completed_time],
                )?;
                tx.commit()?;
                Ok(todo)
            })
            .await?;

        log::debug!("added todo {} to {}", todo.id, self.path.display());
        Ok(todo)
    }

    async fn get_todo_by_id(&self, id: TodoId) -> Result<Todo> {
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
            let todo = select_todo(&tx, id)?;
            tx.commit()?;
            todo.ok_or(StorageError::NotFound(id))
        })
        .await
    }

    async fn update_todo_status(&self, id: TodoId, status: TodoStatus) -> Result<Todo> {
        self.with_conn(move |conn| {
            // Read and write back inside one write transaction.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut todo = select_todo(&tx, id)?.ok_or(StorageError::NotFound(id))?;
            todo.set_status(status);
            tx.execute(
                "UPDATE todos SET status = ?1, completed_time = ?2 WHERE id = ?3",
                params![todo.status.as_str(), todo.completed_time, todo.id],
            )?;
            tx.commit()?;
            Ok(todo)
        })
        .await
    }

    async fn delete_todo(&self, id: TodoId) -> Result<()> {
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let removed = tx.execute("DELETE FROM todos WHERE id = ?1", params![id])?;
            if removed == 0 {
                return Err(StorageError::NotFound(id));
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_scratch() -> (tempfile::TempDir, SqliteTodoStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteTodoStore::open(dir.path().join("todos.sqlite3")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn add_then_get_returns_fresh_todo() {
        let (_dir, store) = open_scratch();

        let added = store.add_todo("\tbuy milk  ").await.unwrap();
        let fetched = store.get_todo_by_id(added.id).await.unwrap();

        assert_eq!(fetched.text, "buy milk");
        assert_eq!(fetched.status, TodoStatus::Todo);
        assert!(fetched.completed_time.is_none());
        assert_eq!(fetched.create_time.len(), "2026-10-18T09:41".len());
    }

    #[tokio::test]
    async fn blank_text_is_rejected_without_writing() {
        let (_dir, store) = open_scratch();

        assert!(matches!(store.add_todo("   ").await, Err(StorageError::EmptyText)));
        assert!(store.get_all_todos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rapid_inserts_get_unique_increasing_ids() {
        let (_dir, store) = open_scratch();

        let mut ids = Vec::new();
        for i in 0..20 {
            ids.push(store.add_todo(&format!("task {i}")).await.unwrap().id);
        }

        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, ids);

        let listed: Vec<TodoId> = store.get_all_todos().await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn status_transitions_maintain_completed_time() {
        let (_dir, store) = open_scratch();
        let todo = store.add_todo("buy milk").await.unwrap();

        let done = store.update_todo_status(todo.id, TodoStatus::Completed).await.unwrap();
        assert!(done.completed_time.is_some());
        assert_eq!(store.get_todo_by_id(todo.id).await.unwrap(), done);

        let reopened = store.update_todo_status(todo.id, TodoStatus::Todo).await.unwrap();
        assert_eq!(reopened.status, TodoStatus::Todo);
        assert!(reopened.completed_time.is_none());
        assert_eq!(reopened.create_time, todo.create_time);

        let working = store.update_todo_status(todo.id, TodoStatus::InProgress).await.unwrap();
        assert!(working.completed_time.is_none());
    }

    #[tokio::test]
    async fn missing_ids_report_not_found() {
        let (_dir, store) = open_scratch();

        assert!(matches!(store.get_todo_by_id(42).await, Err(StorageError::NotFound(42))));
        assert!(matches!(
            store.update_todo_status(42, TodoStatus::Completed).await,
            Err(StorageError::NotFound(42))
        ));
        assert!(matches!(store.delete_todo(42).await, Err(StorageError::NotFound(42))));
    }

    #[tokio::test]
    async fn delete_removes_only_the_target() {
        let (_dir, store) = open_scratch();
        let keep = store.add_todo("keep").await.unwrap();
        let drop = store.add_todo("drop").await.unwrap();

        store.delete_todo(drop.id).await.unwrap();

        let all = store.get_all_todos().await.unwrap();
        assert_eq!(all, vec![keep]);
        assert!(store.get_todo_by_id(drop.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn reopening_keeps_data_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.sqlite3");

        let id = {
            let store = SqliteTodoStore::open(&path).unwrap();
            store.add_todo("survives restart").await.unwrap().id
        };

        let store = SqliteTodoStore::open(&path).unwrap();
        assert_eq!(store.get_todo_by_id(id).await.unwrap().text, "survives restart");

        let version: i64 = store
            .with_conn(|c| Ok(c.query_row("PRAGMA user_version", [], |r| r.get(0))?))
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn connection_is_never_recycled() {
        let (dir, store) = open_scratch();

        assert_eq!(store.pool.max_size(), 1);
        assert_eq!(store.pool.max_lifetime(), None);
        assert_eq!(store.pool.idle_timeout(), None);
        assert_eq!(store.path(), dir.path().join("todos.sqlite3"));
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.sqlite3");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1).unwrap();
        }

        let err = SqliteTodoStore::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Persistence(msg) if msg.contains("newer")));
    }

    #[test]
    fn unopenable_path_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("todos.sqlite3");

        assert!(matches!(SqliteTodoStore::open(&path), Err(StorageError::Persistence(_))));
    }
}
