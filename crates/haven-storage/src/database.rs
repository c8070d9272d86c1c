//! Database connection and initialization

use crate::{migrations, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` and bring its schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA secure_delete=ON;")?;

        migrations::run_migrations(&conn)?;

        tracing::debug!("Opened database at {}", path.display());
        Ok(Self { conn })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Get connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin transaction
    pub fn transaction(&mut self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_database() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("sub").join("haven.db")).unwrap();
        let tables: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('secrets', 'blobs')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("haven.db");
        {
            let db = Database::open(&path).unwrap();
            db.conn()
                .execute(
                    "INSERT INTO blobs (key, value, updated_at) VALUES ('k', 'v', 0)",
                    [],
                )
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        let value: String = db
            .conn()
            .query_row("SELECT value FROM blobs WHERE key = 'k'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, "v");
    }

    #[test]
    fn test_in_memory() {
        let mut db = Database::open_in_memory().unwrap();
        let tx = db.transaction().unwrap();
        tx.execute(
            "INSERT INTO secrets (key, value, updated_at) VALUES ('a', 'b', 0)",
            [],
        )
        .unwrap();
        tx.commit().unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM secrets", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
