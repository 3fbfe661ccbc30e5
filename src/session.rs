//! Persistent storage for the signed-in session token.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const TOKEN_KEY: &str = "auth_token";

/// Trait for session token storage backends.
pub trait SessionStore: Send + Sync {
  /// The stored bearer token, if signed in.
  fn token(&self) -> Result<Option<String>>;

  /// Store a bearer token, replacing any previous one.
  fn set_token(&self, token: &str) -> Result<()>;

  /// Forget the stored token.
  fn clear(&self) -> Result<()>;
}

/// Session store kept in memory only. Used by tests and `--no-persist`.
#[derive(Default)]
pub struct MemorySessionStore {
  token: Mutex<Option<String>>,
}

impl MemorySessionStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_token(token: &str) -> Self {
    Self {
      token: Mutex::new(Some(token.to_string())),
    }
  }
}

impl SessionStore for MemorySessionStore {
  fn token(&self) -> Result<Option<String>> {
    let token = self
      .token
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(token.clone())
  }

  fn set_token(&self, token: &str) -> Result<()> {
    let mut slot = self
      .token
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *slot = Some(token.to_string());
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let mut slot = self
      .token
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *slot = None;
    Ok(())
  }
}

/// SQLite-backed key/value store, the local equivalent of browser storage.
pub struct SqliteSessionStore {
  conn: Mutex<Connection>,
}

impl SqliteSessionStore {
  /// Open the session database at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Open (or create) the session database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open session database at {}: {}", path.display(), e))?;

    conn
      .execute_batch(SESSION_SCHEMA)
      .map_err(|e| eyre!("Failed to run session migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("opsdash").join("session.db"))
  }

  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM local_storage WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read {}: {}", key, e))
  }

  fn put(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO local_storage (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write {}: {}", key, e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM local_storage WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove {}: {}", key, e))?;

    Ok(())
  }
}

const SESSION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS local_storage (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SessionStore for SqliteSessionStore {
  fn token(&self) -> Result<Option<String>> {
    self.get(TOKEN_KEY)
  }

  fn set_token(&self, token: &str) -> Result<()> {
    self.put(TOKEN_KEY, token)
  }

  fn clear(&self) -> Result<()> {
    self.remove(TOKEN_KEY)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_memory_store_roundtrip() {
    let store = MemorySessionStore::new();
    assert_eq!(store.token().unwrap(), None);

    store.set_token("abc").unwrap();
    assert_eq!(store.token().unwrap().as_deref(), Some("abc"));

    store.clear().unwrap();
    assert_eq!(store.token().unwrap(), None);
  }

  #[test]
  fn test_sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.db");

    {
      let store = SqliteSessionStore::open_at(&path).unwrap();
      store.set_token("first").unwrap();
      store.set_token("second").unwrap();
    }

    let store = SqliteSessionStore::open_at(&path).unwrap();
    assert_eq!(store.token().unwrap().as_deref(), Some("second"));

    store.clear().unwrap();
    assert_eq!(store.token().unwrap(), None);
  }
}
