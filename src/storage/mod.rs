//! Local key/value storage for session ids
//!
//! The client remembers which backend session belongs to which persona so a
//! restart resumes the same conversation. Values live under keys of the form
//! `session_<roleId>`.

use crate::config::StorageConfig;
use crate::error::{Result, RoleplayError};
use anyhow::Context;
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Prefix of every persisted session-id key
pub const SESSION_KEY_PREFIX: &str = "session_";

/// Build the storage key for a persona's session id
///
/// # Examples
///
/// ```
/// use roleplay_chat::storage::session_key;
///
/// assert_eq!(session_key(3), "session_3");
/// ```
pub fn session_key(role_id: u64) -> String {
    format!("{}{}", SESSION_KEY_PREFIX, role_id)
}

/// String key/value store with `localStorage` semantics
///
/// Missing keys read as `None`; removing a missing key is not an error.
pub trait LocalStorage: Send + Sync {
    /// Read a value
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite a value
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// SQLite-backed storage
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Open the store described by the configuration
    ///
    /// Uses `storage.db_path` when set, otherwise `storage.db` in the
    /// platform data directory.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        if let Some(path) = &config.db_path {
            return Self::new_with_path(path.clone());
        }

        let proj_dirs = ProjectDirs::from("com", "roleplay", "roleplay-chat")
            .ok_or_else(|| RoleplayError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| RoleplayError::Storage(e.to_string()))?;

        Self::new_with_path(data_dir.join("storage.db"))
    }

    /// Create a storage instance that uses the specified database path
    ///
    /// # Examples
    ///
    /// ```
    /// use roleplay_chat::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("storage.db")).unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| RoleplayError::Storage(e.to_string()))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        tracing::debug!("Opened session storage at {}", storage.db_path.display());
        Ok(storage)
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| RoleplayError::Storage(e.to_string()).into())
    }

    fn init(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| RoleplayError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl LocalStorage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        let value = conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query storage")
            .map_err(|e| RoleplayError::Storage(e.to_string()))?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )
        .context("Failed to write storage")
        .map_err(|e| RoleplayError::Storage(e.to_string()))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM local_storage WHERE key = ?", params![key])
            .context("Failed to delete from storage")
            .map_err(|e| RoleplayError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// In-memory storage for tests and embedders that do not want a database
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| RoleplayError::Storage("storage lock poisoned".to_string()).into())
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
