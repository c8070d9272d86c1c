//! Secret store boundary
//!
//! Opaque key to string persistence for PIN credentials. On a device the
//! primary implementation is the platform keychain/keystore, registered with
//! [`set_platform_secret_store`]; [`SqliteSecretStore`] is the software
//! fallback used when the platform store is missing or failing.

use crate::{Database, Error, Result};
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use zeroize::Zeroizing;

/// Key to string secret persistence
pub trait SecretStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    fn set_secret(&self, key: &str, value: &str) -> Result<()>;

    /// Fetch the value under `key`
    fn get_secret(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`; removing a missing key is not an error
    fn delete_secret(&self, key: &str) -> Result<()>;
}

// ============================================================================
// Platform registration
// ============================================================================

static PLATFORM_SECRET_STORE: OnceLock<RwLock<Option<Arc<dyn SecretStore>>>> = OnceLock::new();

fn platform_slot() -> &'static RwLock<Option<Arc<dyn SecretStore>>> {
    PLATFORM_SECRET_STORE.get_or_init(|| RwLock::new(None))
}

/// Register the platform secret store for this process.
pub fn set_platform_secret_store(store: Arc<dyn SecretStore>) {
    *platform_slot().write() = Some(store);
}

/// Clear the registered platform secret store.
pub fn clear_platform_secret_store() {
    *platform_slot().write() = None;
}

/// Get the registered platform secret store, if any.
pub fn platform_secret_store() -> Option<Arc<dyn SecretStore>> {
    platform_slot().read().clone()
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local secret store, for tests and ephemeral sessions
#[derive(Default)]
pub struct MemorySecretStore {
    entries: RwLock<HashMap<String, Zeroizing<String>>>,
}

impl MemorySecretStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SecretStore for MemorySecretStore {
    fn set_secret(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), Zeroizing::new(value.to_string()));
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).map(|v| v.to_string()))
    }

    fn delete_secret(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

// ============================================================================
// SQLite fallback
// ============================================================================

/// Secret store backed by the `secrets` table
pub struct SqliteSecretStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteSecretStore {
    /// Create a store over a shared database
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }
}

impl SecretStore for SqliteSecretStore {
    fn set_secret(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock();
        db.conn().execute(
            "INSERT OR REPLACE INTO secrets (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock();
        let value = db
            .conn()
            .query_row(
                "SELECT value FROM secrets WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn delete_secret(&self, key: &str) -> Result<()> {
        let db = self.db.lock();
        db.conn()
            .execute("DELETE FROM secrets WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// ============================================================================
// Primary with fallback
// ============================================================================

/// Prefers the primary store and falls back to a software store when the
/// primary fails.
///
/// Reads consult the fallback when the primary has nothing, so secrets
/// written during an earlier outage are still found. Deletes go to both.
pub struct FallbackSecretStore {
    primary: Option<Arc<dyn SecretStore>>,
    fallback: Arc<dyn SecretStore>,
}

impl FallbackSecretStore {
    /// Combine a primary and a fallback store
    pub fn new(primary: Arc<dyn SecretStore>, fallback: Arc<dyn SecretStore>) -> Self {
        Self {
            primary: Some(primary),
            fallback,
        }
    }

    /// Use the registered platform store as primary, if one is registered
    pub fn from_platform(fallback: Arc<dyn SecretStore>) -> Self {
        let primary = platform_secret_store();
        if primary.is_none() {
            tracing::warn!("No platform secret store registered, using software fallback");
        }
        Self { primary, fallback }
    }
}

impl SecretStore for FallbackSecretStore {
    fn set_secret(&self, key: &str, value: &str) -> Result<()> {
        if let Some(primary) = &self.primary {
            match primary.set_secret(key, value) {
                Ok(()) => {
                    // Drop any stale copy left from an earlier outage.
                    if let Err(e) = self.fallback.delete_secret(key) {
                        tracing::warn!("Failed to clear fallback secret: {}", e);
                    }
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Platform secret store write failed, using fallback: {}", e);
                }
            }
        }
        self.fallback.set_secret(key, value)
    }

    fn get_secret(&self, key: &str) -> Result<Option<String>> {
        if let Some(primary) = &self.primary {
            match primary.get_secret(key) {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Platform secret store read failed, using fallback: {}", e);
                }
            }
        }
        self.fallback.get_secret(key)
    }

    fn delete_secret(&self, key: &str) -> Result<()> {
        let primary_result = match &self.primary {
            Some(primary) => primary.delete_secret(key),
            None => Ok(()),
        };
        let fallback_result = self.fallback.delete_secret(key);
        match (primary_result, fallback_result) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), _) | (_, Err(e)) => Err(Error::Unavailable(format!(
                "Failed to delete secret: {}",
                e
            ))),
        }
    }
}
