//! Record store boundary: opaque keyed JSON blobs.

use crate::{Database, Result};
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use std::sync::Arc;

/// Keyed blob persistence.
///
/// `put_blob` must replace the whole value atomically; the evidence vault
/// relies on that for all-or-nothing re-keying.
pub trait RecordStore: Send + Sync {
    /// Fetch the blob under `key`
    fn get_blob(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous blob
    fn put_blob(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove_blob(&self, key: &str) -> Result<()>;

    /// Remove every blob
    fn clear(&self) -> Result<()>;
}

/// Process-local record store
#[derive(Default)]
pub struct MemoryRecordStore {
    blobs: RwLock<HashMap<String, String>>,
}

impl MemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored, unordered
    pub fn keys(&self) -> Vec<String> {
        self.blobs.read().keys().cloned().collect()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get_blob(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn put_blob(&self, key: &str, value: &str) -> Result<()> {
        self.blobs.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_blob(&self, key: &str) -> Result<()> {
        self.blobs.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.blobs.write().clear();
        Ok(())
    }
}

/// Record store backed by the `blobs` table
pub struct SqliteRecordStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteRecordStore {
    /// Create a store over a shared database
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }
}

impl RecordStore for SqliteRecordStore {
    fn get_blob(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock();
        let value = db
            .conn()
            .query_row(
                "SELECT value FROM blobs WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_blob(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock();
        db.conn().execute(
            "INSERT OR REPLACE INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn remove_blob(&self, key: &str) -> Result<()> {
        let db = self.db.lock();
        db.conn()
            .execute("DELETE FROM blobs WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let db = self.db.lock();
        db.conn().execute("DELETE FROM blobs", [])?;
        Ok(())
    }
}
