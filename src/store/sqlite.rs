//! SQLite-backed storage medium.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::medium::{check_quota, StorageError, StorageMedium};

/// Schema for the key/value table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Persistent medium in a single SQLite table, bounded by a byte quota.
pub struct SqliteMedium {
  conn: Mutex<Connection>,
  quota: usize,
}

impl SqliteMedium {
  /// Open or create the store at `path`.
  pub fn open(path: &Path, quota: usize) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create store directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open store at {}: {}", path.display(), e))?;

    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run store migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
      quota,
    })
  }

  /// Get the default store path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("culina").join("store.db"))
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
    self
      .conn
      .lock()
      .map_err(|e| StorageError::Backend(format!("Lock poisoned: {}", e)))
  }
}

fn backend(e: rusqlite::Error) -> StorageError {
  StorageError::Backend(e.to_string())
}

impl StorageMedium for SqliteMedium {
  fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
    let conn = self.lock()?;
    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(backend)
  }

  fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let conn = self.lock()?;

    let used: i64 = conn
      .query_row(
        "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
         FROM kv_store WHERE key != ?",
        params![key],
        |row| row.get(0),
      )
      .map_err(backend)?;
    check_quota(key, value, used.max(0) as usize, self.quota)?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(backend)?;

    Ok(())
  }

  fn delete(&self, key: &str) -> Result<(), StorageError> {
    let conn = self.lock()?;
    conn
      .execute("DELETE FROM kv_store WHERE key = ?", params![key])
      .map_err(backend)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.db");

    {
      let medium = SqliteMedium::open(&path, 1024).unwrap();
      medium.write("feed", r#"{"recipes":[]}"#).unwrap();
    }

    let medium = SqliteMedium::open(&path, 1024).unwrap();
    assert_eq!(
      medium.read("feed").unwrap().as_deref(),
      Some(r#"{"recipes":[]}"#)
    );
    assert_eq!(medium.read("missing").unwrap(), None);
  }

  #[test]
  fn test_quota_rejects_oversized_write() {
    let dir = tempfile::tempdir().unwrap();
    let medium = SqliteMedium::open(&dir.path().join("store.db"), 16).unwrap();

    medium.write("a", "0123456789").unwrap();
    let err = medium.write("b", "0123456789").unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { .. }));

    // Replacing "a" with a value of the same size still fits
    medium.write("a", "9876543210").unwrap();
    assert_eq!(medium.read("a").unwrap().as_deref(), Some("9876543210"));
    assert_eq!(medium.read("b").unwrap(), None);
  }

  #[test]
  fn test_delete_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let medium = SqliteMedium::open(&dir.path().join("store.db"), 1024).unwrap();

    medium.write("a", "1").unwrap();
    medium.delete("a").unwrap();
    medium.delete("a").unwrap();
    assert_eq!(medium.read("a").unwrap(), None);
  }
}
