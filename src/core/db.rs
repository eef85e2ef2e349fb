//! Connection providers
//!
//! Every store and the bootstrap are written against [`ConnectionProvider`],
//! which lends out one connection for the duration of a closure. The
//! connection is released on every exit path, including early `?` returns.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::Connection;

use super::error::StoreError;

/// Scoped access to a SQLite connection
pub trait ConnectionProvider: Send + Sync {
    /// Run `f` with a connection that has foreign keys enabled
    fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>;
}

/// Opens a fresh connection to a database file on every call
#[derive(Debug, Clone)]
pub struct SqliteFile {
    path: PathBuf,
}

impl SqliteFile {
    /// Point at a database file. The file (and its parent directory) is
    /// created on first connection if absent.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Connection(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        let conn = Connection::open(&self.path)
            .map_err(|e| StoreError::Connection(format!("{}: {}", self.path.display(), e)))?;
        configure(&conn)?;
        Ok(conn)
    }
}

impl ConnectionProvider for SqliteFile {
    fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        let mut conn = self.open()?;
        f(&mut conn)
    }
}

/// A single connection shared behind a mutex (in-memory databases, tests)
#[derive(Debug)]
pub struct SharedConnection {
    conn: Mutex<Connection>,
}

impl SharedConnection {
    pub fn new(conn: Connection) -> Result<Self, StoreError> {
        configure(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::new(conn)
    }
}

impl ConnectionProvider for SharedConnection {
    fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::Connection("connection mutex poisoned".to_string()))?;
        f(&mut guard)
    }
}

fn configure(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")
        .map_err(|e| StoreError::Connection(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn foreign_keys(conn: &Connection) -> i64 {
        conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_file_provider_creates_parent_directory() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested/dir/hospital.db");
        let provider = SqliteFile::new(&path);

        let fk = provider
            .with_connection(|conn| Ok(foreign_keys(conn)))
            .unwrap();

        assert_eq!(fk, 1);
        assert!(path.exists());
    }

    #[test]
    fn test_shared_connection_keeps_state_between_calls() {
        let provider = SharedConnection::in_memory().unwrap();
        provider
            .with_connection(|conn| {
                conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")?;
                Ok(())
            })
            .unwrap();

        let count: i64 = provider
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(provider.with_connection(|c| Ok(foreign_keys(c))).unwrap(), 1);
    }

    #[test]
    fn test_closure_error_is_returned() {
        let provider = SharedConnection::in_memory().unwrap();
        let result: Result<(), _> = provider.with_connection(|_| {
            Err(StoreError::NotFound {
                entity: "doctor",
                id: 9,
            })
        });
        assert!(matches!(result, Err(StoreError::NotFound { id: 9, .. })));
    }
}
