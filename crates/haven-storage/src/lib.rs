//! Persistence for Haven
//!
//! Provides the secret store and record store boundaries with in-memory and
//! SQLite backends, plus everything built on top of them: PIN credentials,
//! the encrypted evidence vault, app settings, the decoy facade and the
//! wipe routine.
//!
//! ## Persisted layout
//!
//! - `haven.pin.<role>` in the secret store: salt, Argon2id hash and cost
//!   parameters for one PIN role
//! - `haven.evidence` in the record store: JSON list of evidence records,
//!   each payload a base64 envelope
//! - `haven.settings` in the record store: app settings JSON

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credentials;
pub mod database;
pub mod decoy;
pub mod error;
pub mod evidence;
pub mod migrations;
pub mod record_store;
pub mod secret_store;
pub mod settings;
pub mod wipe;

pub use credentials::{credential_key, Credential, CredentialManager, CREDENTIAL_KEY_PREFIX};
pub use database::Database;
pub use decoy::DecoyFacade;
pub use error::{Error, Result};
pub use evidence::{
    EvidenceKind, EvidenceMeta, EvidenceRecord, EvidenceSummary, EvidenceVault, GeoTag,
    EVIDENCE_KEY,
};
pub use record_store::{MemoryRecordStore, RecordStore, SqliteRecordStore};
pub use secret_store::{
    clear_platform_secret_store, platform_secret_store, set_platform_secret_store,
    FallbackSecretStore, MemorySecretStore, SecretStore, SqliteSecretStore,
};
pub use settings::{AppSettings, SettingsStore, SETTINGS_KEY};
