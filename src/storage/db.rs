use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

use super::{KeyValueStore, StoreError, StoredValue};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS data (
    path TEXT PRIMARY KEY NOT NULL,
    kind TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and makes sure the
/// `data` table exists.
///
/// # Example
///
/// ```no_run
/// use carrierbot::storage::db;
///
/// let pool = db::create_pool("data.sqlite")?;
/// # Ok::<(), carrierbot::storage::StoreError>(())
/// ```
pub fn create_pool(database_path: &str) -> Result<DbPool, StoreError> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder().max_size(10).build(manager)?;
    let conn = get_connection(&pool)?;
    migrate_schema(&conn)?;
    Ok(pool)
}

/// Pool over a private in-memory database
///
/// Every SQLite in-memory connection is its own database, so the pool is
/// limited to a single connection.
pub fn create_memory_pool() -> Result<DbPool, StoreError> {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager)?;
    {
        // The only connection has to go back to the pool before it is used
        let conn = get_connection(&pool)?;
        migrate_schema(&conn)?;
    }
    Ok(pool)
}

/// Get a connection from the pool
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, StoreError> {
    Ok(pool.get()?)
}

fn migrate_schema(conn: &rusqlite::Connection) -> Result<(), StoreError> {
    conn.execute(SCHEMA, [])?;
    Ok(())
}

/// [`KeyValueStore`] kept in SQLite
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database file at `path`
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Ok(Self::new(create_pool(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(create_memory_pool()?))
    }
}

impl KeyValueStore for SqliteStore {
    fn set(&self, path: &str, value: StoredValue) -> Result<(), StoreError> {
        let (kind, raw) = match value {
            StoredValue::Text(text) => ("text", text),
            StoredValue::Json(json) => ("json", serde_json::to_string(&json)?),
        };

        let conn = get_connection(&self.pool)?;
        conn.execute(
            "INSERT INTO data (path, kind, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(path) DO UPDATE SET kind = excluded.kind, value = excluded.value,
                 updated_at = CURRENT_TIMESTAMP",
            params![path, kind, raw],
        )?;
        log::debug!("Stored {} value at {}", kind, path);
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Option<StoredValue>, StoreError> {
        let conn = get_connection(&self.pool)?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT kind, value FROM data WHERE path = ?1",
                params![path],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(kind, raw)| stored_value(&kind, raw)).transpose()
    }

    fn descendants(&self, path: &str) -> Result<Vec<(String, StoredValue)>, StoreError> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT path, kind, value FROM data
             WHERE substr(path, 1, length(?1)) = ?1
             ORDER BY path",
        )?;
        let rows = stmt.query_map(params![prefix], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (full_path, kind, raw) = row?;
            let Some(relative) = full_path.strip_prefix(&prefix) else {
                continue;
            };
            entries.push((relative.to_string(), stored_value(&kind, raw)?));
        }
        Ok(entries)
    }
}

fn stored_value(kind: &str, raw: String) -> Result<StoredValue, StoreError> {
    match kind {
        "json" => Ok(StoredValue::Json(serde_json::from_str(&raw)?)),
        _ => Ok(StoredValue::Text(raw)),
    }
}
