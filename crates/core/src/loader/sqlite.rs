//! SQLite loader storing items as JSON payload rows.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use rusqlite::{params, Connection};

use super::create_parent_dir;
use super::error::LoaderError;
use super::traits::Loader;
use crate::spider::Item;

/// Table used when neither the item type nor the configuration names one.
pub const DEFAULT_TABLE: &str = "items";

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Whether `name` can be used unquoted as a table name.
pub fn is_valid_table_name(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Appends each item as a row `(id, payload, loaded_at)`.
pub struct SqliteLoader {
    name: String,
    path: PathBuf,
    table: String,
    conn: Mutex<Option<Connection>>,
}

impl SqliteLoader {
    /// Creates a loader writing to `table` in the database at `path`.
    pub fn new(path: impl Into<PathBuf>, table: impl Into<String>) -> Result<Self, LoaderError> {
        let path = path.into();
        let table = table.into();
        if !is_valid_table_name(&table) {
            return Err(LoaderError::Configuration(format!(
                "invalid table name '{}'",
                table
            )));
        }
        Ok(Self {
            name: format!("sqlite:{}:{}", path.display(), table),
            path,
            table,
            conn: Mutex::new(None),
        })
    }

    /// Creates a loader using the item type's table, or [`DEFAULT_TABLE`].
    pub fn for_item<I: Item>(path: impl Into<PathBuf>) -> Result<Self, LoaderError> {
        Self::new(path, I::table_name().unwrap_or(DEFAULT_TABLE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl<I: Item> Loader<I> for SqliteLoader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self) -> Result<(), LoaderError> {
        create_parent_dir(&self.path).await?;
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL,
                loaded_at TEXT NOT NULL
            );",
            self.table
        ))?;
        let slot = self
            .conn
            .get_mut()
            .map_err(|_| LoaderError::Database("connection lock poisoned".to_string()))?;
        *slot = Some(conn);
        Ok(())
    }

    async fn dump(&self, item: &I) -> Result<(), LoaderError> {
        let payload = serde_json::to_string(item)?;
        let guard = self
            .conn
            .lock()
            .map_err(|_| LoaderError::Database("connection lock poisoned".to_string()))?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| LoaderError::NotReady(format!("{} is not open", self.name)))?;

        conn.execute(
            &format!(
                "INSERT INTO {} (payload, loaded_at) VALUES (?1, ?2)",
                self.table
            ),
            params![payload, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), LoaderError> {
        let slot = self
            .conn
            .get_mut()
            .map_err(|_| LoaderError::Database("connection lock poisoned".to_string()))?;
        if let Some(conn) = slot.take() {
            conn.close().map_err(|(_, e)| LoaderError::from(e))?;
        }
        Ok(())
    }
}
