//! `SQLite`-backed key/value storage.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::chat::core::errors::StorageResult;
use crate::chat::storage::local_storage::LocalStorage;

/// Durable key/value storage in a single `SQLite` table.
pub struct SqliteStorage {
    conn: Connection,
    table: String,
}

impl SqliteStorage {
    /// Table name for stored items.
    pub const DEFAULT_TABLE: &'static str = "local_storage";

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the table cannot be created.
    pub fn open(path: impl AsRef<Path>, table: &str) -> StorageResult<Self> {
        Self::with_connection(Connection::open(path)?, table)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the table cannot be created.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, Self::DEFAULT_TABLE)
    }

    /// Wrap an existing connection and create the table if it doesn't exist.
    ///
    /// `table` must be a plain identifier; it is interpolated into SQL.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub fn with_connection(conn: Connection, table: &str) -> StorageResult<Self> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )"
        ))?;

        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }
}

impl LocalStorage for SqliteStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                &format!("SELECT value FROM {} WHERE key = ?1", self.table),
                rusqlite::params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (key, value, updated_at) VALUES (?1, ?2, ?3)",
                self.table
            ),
            rusqlite::params![key, value, now_ms],
        )?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        self.conn.execute(
            &format!("DELETE FROM {} WHERE key = ?1", self.table),
            rusqlite::params![key],
        )?;
        Ok(())
    }
}
