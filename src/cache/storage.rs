//! User store trait and its SQLite and in-memory implementations.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::config::Config;
use crate::users::User;

/// Trait for local user storage backends.
///
/// Implementations must make `write_all` atomic: concurrent full replaces
/// resolve as last-write-wins, never as a mix of both sets.
pub trait UserStore: Send + Sync {
  /// All cached users in stored order. Empty when nothing has been cached.
  fn read_all(&self) -> Result<Vec<User>>;

  /// Replace the cached set with `users`, upserting by id.
  ///
  /// Idempotent: writing the same set twice leaves the same state as once.
  fn write_all(&self, users: &[User]) -> Result<()>;
}

impl<T: UserStore + ?Sized> UserStore for Arc<T> {
  fn read_all(&self) -> Result<Vec<User>> {
    (**self).read_all()
  }

  fn write_all(&self, users: &[User]) -> Result<()> {
    (**self).write_all(users)
  }
}

impl<T: UserStore + ?Sized> UserStore for Box<T> {
  fn read_all(&self) -> Result<Vec<User>> {
    (**self).read_all()
  }

  fn write_all(&self, users: &[User]) -> Result<()> {
    (**self).write_all(users)
  }
}

/// Store kept in process memory. Used with `--ephemeral` and in tests.
#[derive(Default)]
pub struct MemoryStorage {
  users: Mutex<Vec<User>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

#[cfg(test)]
impl MemoryStorage {
  pub fn with_users(users: Vec<User>) -> Self {
    Self {
      users: Mutex::new(dedup_by_id(&users)),
    }
  }
}

impl UserStore for MemoryStorage {
  fn read_all(&self) -> Result<Vec<User>> {
    let users = self
      .users
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(users.clone())
  }

  fn write_all(&self, users: &[User]) -> Result<()> {
    let replaced = dedup_by_id(users);
    let mut current = self
      .users
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *current = replaced;
    Ok(())
  }
}

/// A repeated id keeps its first position and its last values.
fn dedup_by_id(users: &[User]) -> Vec<User> {
  let mut out: Vec<User> = Vec::with_capacity(users.len());
  for user in users {
    match out.iter_mut().find(|u| u.id == user.id) {
      Some(existing) => *existing = user.clone(),
      None => out.push(user.clone()),
    }
  }
  out
}

/// SQLite-based user storage.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the store at `path`, or at the default location when `None`.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    debug!(path = %path.display(), "opened user cache");
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    Ok(Config::data_dir()?.join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

#[cfg(test)]
impl SqliteStorage {
  /// Open a store that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;
    Self::from_connection(conn)
  }
}

/// Schema for the user cache.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    img TEXT NOT NULL,
    name TEXT NOT NULL,
    username TEXT NOT NULL,
    -- order the server returned the users in
    position INTEGER NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl UserStore for SqliteStorage {
  fn read_all(&self) -> Result<Vec<User>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT id, name, username, img FROM users ORDER BY position, id")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let users = stmt
      .query_map([], |row| {
        Ok(User {
          id: row.get(0)?,
          name: row.get(1)?,
          username: row.get(2)?,
          img: row.get(3)?,
        })
      })
      .map_err(|e| eyre!("Failed to query users: {}", e))?
      .collect::<rusqlite::Result<Vec<User>>>()
      .map_err(|e| eyre!("Failed to read user row: {}", e))?;

    Ok(users)
  }

  fn write_all(&self, users: &[User]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute("DELETE FROM users", [])
      .map_err(|e| eyre!("Failed to clear users: {}", e))?;

    {
      let mut stmt = tx
        .prepare(
          "INSERT INTO users (id, img, name, username, position, cached_at)
           VALUES (?, ?, ?, ?, ?, datetime('now'))
           ON CONFLICT(id) DO UPDATE SET
             img = excluded.img,
             name = excluded.name,
             username = excluded.username",
        )
        .map_err(|e| eyre!("Failed to prepare insert: {}", e))?;

      for (position, user) in users.iter().enumerate() {
        stmt
          .execute(params![
            user.id,
            user.img,
            user.name,
            user.username,
            position as i64
          ])
          .map_err(|e| eyre!("Failed to store user {}: {}", user.id, e))?;
      }
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    debug!(count = users.len(), "replaced cached users");
    Ok(())
  }
}
